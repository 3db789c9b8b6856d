//! CloudWatch integration models
//!
//! [`IntegrationShape`] is the configuration this tool owns and re-submits on
//! every update; [`IntegrationRecord`] is what the backend hands back.

use serde::{Deserialize, Serialize};

/// Default poll rate for metrics and metadata, in milliseconds.
pub const DEFAULT_POLL_RATE_MS: u64 = 60_000;

/// Configuration fields of a CloudWatch integration.
///
/// The integration API replaces the whole record on update, so every field here
/// is sent on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationShape {
    pub name: String,
    pub named_token: String,
    pub regions: Vec<String>,
    pub sfx_aws_account_arn: String,
    pub poll_rate_ms: u64,
    pub metadata_poll_rate_ms: u64,
    pub enabled: bool,
    pub enable_aws_usage: bool,
    pub import_cloud_watch: bool,
}

impl IntegrationShape {
    /// Shape with the default poll rates and every feature switched on.
    pub fn new(
        name: impl Into<String>,
        named_token: impl Into<String>,
        regions: Vec<String>,
        sfx_aws_account_arn: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            named_token: named_token.into(),
            regions,
            sfx_aws_account_arn: sfx_aws_account_arn.into(),
            poll_rate_ms: DEFAULT_POLL_RATE_MS,
            metadata_poll_rate_ms: DEFAULT_POLL_RATE_MS,
            enabled: true,
            enable_aws_usage: true,
            import_cloud_watch: true,
        }
    }

    /// First required field that is empty, if any.
    ///
    /// An empty `regions` list counts as missing: sending it would wipe the
    /// polling scope of an existing integration.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.named_token.trim().is_empty() {
            Some("namedToken")
        } else if self.regions.is_empty() || self.regions.iter().any(|r| r.trim().is_empty()) {
            Some("regions")
        } else if self.sfx_aws_account_arn.trim().is_empty() {
            Some("sfxAwsAccountArn")
        } else {
            None
        }
    }
}

/// Integration record as returned by the backend.
///
/// Only the fields this tool reasons about are typed; everything else is kept
/// in `extra` so the full record can be shown to the operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IntegrationRecord {
    /// Non-empty `id`, if present.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|v| !v.is_empty())
    }

    /// Non-empty `externalId`, if present.
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref().filter(|v| !v.is_empty())
    }
}
