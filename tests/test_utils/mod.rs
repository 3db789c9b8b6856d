//! Test utilities shared by the integration suites.
//!
//! Provides an in-memory IAM fake, canned trust policies and wiremock helpers
//! for the session and integration endpoints.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use integration_sync::auth::{SessionClient, SessionIdentity};
use integration_sync::lifecycle::{Components, LifecycleSettings};
use integration_sync::models::{IntegrationShape, RoleTarget};
use integration_sync::registry::IntegrationClient;
use integration_sync::store::MemoryBindingStore;
use integration_sync::trust_policy::{RolePolicyApi, TrustPolicyError};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

pub const ROLE_ARN: &str = "arn:aws:iam::999:role/MonitorRole";
pub const ROLE_NAME: &str = "MonitorRole";
pub const DEFAULT_EXTERNAL_ID: &str = "placeholder";
pub const ACCESS_TOKEN: &str = "tok-123";

/// A trust policy with one statement trusting the SaaS account under
/// `external_id` and one unrelated service statement.
pub fn trust_policy(external_id: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": { "AWS": "arn:aws:iam::134183635603:root" },
                "Action": "sts:AssumeRole",
                "Condition": { "StringEquals": { "sts:ExternalId": external_id } }
            },
            {
                "Effect": "Allow",
                "Principal": { "Service": "ec2.amazonaws.com" },
                "Action": "sts:AssumeRole"
            }
        ]
    })
}

pub fn external_id_of(policy: &Value) -> &str {
    policy["Statement"][0]["Condition"]["StringEquals"]["sts:ExternalId"]
        .as_str()
        .unwrap_or_default()
}

/// In-memory stand-in for IAM `GetRole` / `UpdateAssumeRolePolicy`.
pub struct FakeRolePolicyApi {
    policy: Mutex<Value>,
    url_encode: bool,
    writes: Mutex<Vec<(String, Value)>>,
    reads: Mutex<Vec<String>>,
    fail_updates: Option<&'static str>,
}

impl FakeRolePolicyApi {
    pub fn with_policy(policy: Value) -> Self {
        Self {
            policy: Mutex::new(policy),
            url_encode: false,
            writes: Mutex::new(Vec::new()),
            reads: Mutex::new(Vec::new()),
            fail_updates: None,
        }
    }

    /// Serve the document URL-encoded, the way `GetRole` returns it.
    pub fn url_encoded(mut self) -> Self {
        self.url_encode = true;
        self
    }

    /// Make every update fail with the given IAM error code.
    pub fn failing_updates(mut self, code: &'static str) -> Self {
        self.fail_updates = Some(code);
        self
    }

    pub fn current(&self) -> Value {
        self.policy.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn written_roles(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(role, _)| role.clone())
            .collect()
    }

    pub fn read_roles(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RolePolicyApi for FakeRolePolicyApi {
    async fn get_assume_role_policy(&self, role_name: &str) -> Result<String, TrustPolicyError> {
        self.reads.lock().unwrap().push(role_name.to_string());
        let raw = self.policy.lock().unwrap().to_string();
        if self.url_encode {
            Ok(utf8_percent_encode(&raw, NON_ALPHANUMERIC).to_string())
        } else {
            Ok(raw)
        }
    }

    async fn update_assume_role_policy(
        &self,
        role_name: &str,
        policy_document: &str,
    ) -> Result<(), TrustPolicyError> {
        if let Some(code) = self.fail_updates {
            return Err(TrustPolicyError::Iam {
                operation: "UpdateAssumeRolePolicy",
                role_name: role_name.to_string(),
                code: Some(code.to_string()),
                message: "User is not authorized to perform iam:UpdateAssumeRolePolicy"
                    .to_string(),
            });
        }
        let document: Value = serde_json::from_str(policy_document)
            .map_err(|e| TrustPolicyError::MalformedDocument(e.to_string()))?;
        *self.policy.lock().unwrap() = document.clone();
        self.writes
            .lock()
            .unwrap()
            .push((role_name.to_string(), document));
        Ok(())
    }
}

pub fn identity() -> SessionIdentity {
    SessionIdentity {
        email: "ops@example.com".to_string(),
        password: "s3cret".to_string(),
        org_id: "ORG1".to_string(),
        realm: "us1".to_string(),
    }
}

pub fn target() -> RoleTarget {
    RoleTarget {
        role_arn: ROLE_ARN.to_string(),
        default_external_id: DEFAULT_EXTERNAL_ID.to_string(),
    }
}

pub fn shape() -> IntegrationShape {
    IntegrationShape::new(
        "acme",
        "ingest-token",
        vec!["us-east-1".to_string()],
        "arn:aws:iam::123:role/sfx",
    )
}

pub fn settings() -> LifecycleSettings {
    LifecycleSettings {
        identity: Some(identity()),
        target: Some(target()),
        integration_id_override: None,
        external_id_override: None,
    }
}

/// Real HTTP clients pointed at `server`, the IAM fake and a memory store.
pub fn components(
    server: &MockServer,
    iam: Arc<FakeRolePolicyApi>,
    store: Arc<MemoryBindingStore>,
) -> Components {
    let http = reqwest::Client::new();
    Components {
        auth: Arc::new(SessionClient::with_api_base(http.clone(), server.uri())),
        registry: Arc::new(IntegrationClient::new(http, server.uri())),
        role_policies: iam,
        store,
    }
}

/// Mount a successful `POST /v2/session`.
pub async fn mount_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/session"))
        .and(body_partial_json(json!({ "organizationId": "ORG1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": ACCESS_TOKEN
        })))
        .mount(server)
        .await;
}

/// Full integration record as the backend returns it.
pub fn integration_record(id: &str, external_id: &str) -> Value {
    json!({
        "id": id,
        "externalId": external_id,
        "name": "acme",
        "type": "AWSCloudWatch",
        "authMethod": "ExternalId",
        "regions": ["us-east-1"],
        "enabled": true,
        "created": 1_700_000_000_000_i64
    })
}
