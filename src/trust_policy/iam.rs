//! IAM access for role trust policies

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_iam::Client as IamClient;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tracing::debug;

use crate::trust_policy::TrustPolicyError;

const DEFAULT_IAM_REGION: &str = "us-east-1";

/// The two IAM calls the synchronizer needs.
#[async_trait]
pub trait RolePolicyApi: Send + Sync {
    /// `GetRole` → the role's `AssumeRolePolicyDocument`, as returned by IAM.
    async fn get_assume_role_policy(&self, role_name: &str) -> Result<String, TrustPolicyError>;

    /// `UpdateAssumeRolePolicy`: replace the whole trust policy.
    async fn update_assume_role_policy(
        &self,
        role_name: &str,
        policy_document: &str,
    ) -> Result<(), TrustPolicyError>;
}

/// [`RolePolicyApi`] backed by the AWS SDK.
pub struct IamRolePolicyApi {
    client: IamClient,
}

impl IamRolePolicyApi {
    /// Build a client from the default AWS credential and region chain.
    ///
    /// IAM is a global service, so a missing region falls back to `us-east-1`.
    pub async fn from_env() -> Self {
        let loaded = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let config = match loaded.region() {
            Some(_) => loaded,
            None => {
                debug!("No AWS region configured, using {}", DEFAULT_IAM_REGION);
                aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(DEFAULT_IAM_REGION))
                    .load()
                    .await
            }
        };
        Self {
            client: IamClient::new(&config),
        }
    }

    pub fn with_client(client: IamClient) -> Self {
        Self { client }
    }
}

fn iam_failure<E, R>(operation: &'static str, role_name: &str, err: SdkError<E, R>) -> TrustPolicyError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let service_err = err.as_service_error();
    let code = service_err.and_then(|e| e.code()).map(str::to_string);
    let message = service_err
        .and_then(|e| e.message())
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    TrustPolicyError::Iam {
        operation,
        role_name: role_name.to_string(),
        code,
        message,
    }
}

#[async_trait]
impl RolePolicyApi for IamRolePolicyApi {
    async fn get_assume_role_policy(&self, role_name: &str) -> Result<String, TrustPolicyError> {
        debug!(role_name, "Fetching role trust policy");
        let output = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| iam_failure("GetRole", role_name, e))?;

        output
            .role()
            .and_then(|role| role.assume_role_policy_document())
            .map(str::to_string)
            .ok_or_else(|| {
                TrustPolicyError::MalformedDocument(format!(
                    "role {} has no AssumeRolePolicyDocument",
                    role_name
                ))
            })
    }

    async fn update_assume_role_policy(
        &self,
        role_name: &str,
        policy_document: &str,
    ) -> Result<(), TrustPolicyError> {
        debug!(role_name, "Writing role trust policy");
        self.client
            .update_assume_role_policy()
            .role_name(role_name)
            .policy_document(policy_document)
            .send()
            .await
            .map_err(|e| iam_failure("UpdateAssumeRolePolicy", role_name, e))?;
        Ok(())
    }
}
