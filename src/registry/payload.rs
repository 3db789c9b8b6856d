//! Request body for the integration endpoints.

use serde::Serialize;

use crate::models::IntegrationShape;
use crate::registry::RegistryError;

pub const AUTH_METHOD_EXTERNAL_ID: &str = "ExternalId";
pub const INTEGRATION_TYPE_CLOUDWATCH: &str = "AWSCloudWatch";

/// Wire form of an integration for `POST` and `PUT`.
///
/// Built only through [`IntegrationPayload::for_create`] and
/// [`IntegrationPayload::for_update`], which refuse incomplete shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationPayload {
    auth_method: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    enable_aws_usage: bool,
    enabled: bool,
    import_cloud_watch: bool,
    metadata_poll_rate: u64,
    name: String,
    named_token: String,
    poll_rate: u64,
    regions: Vec<String>,
    sfx_aws_account_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_id: Option<String>,
}

impl IntegrationPayload {
    /// Create body. No role ARN: the role does not trust the integration yet.
    pub fn for_create(shape: &IntegrationShape) -> Result<Self, RegistryError> {
        Self::from_shape(shape, None, None)
    }

    /// Full-replace body carrying the role ARN and the bound external ID.
    pub fn for_update(
        shape: &IntegrationShape,
        external_id: &str,
        role_arn: &str,
    ) -> Result<Self, RegistryError> {
        if role_arn.trim().is_empty() {
            return Err(RegistryError::IncompletePayload { field: "roleArn" });
        }
        if external_id.trim().is_empty() {
            return Err(RegistryError::IncompletePayload {
                field: "externalId",
            });
        }
        Self::from_shape(
            shape,
            Some(role_arn.to_string()),
            Some(external_id.to_string()),
        )
    }

    fn from_shape(
        shape: &IntegrationShape,
        role_arn: Option<String>,
        external_id: Option<String>,
    ) -> Result<Self, RegistryError> {
        if let Some(field) = shape.missing_field() {
            return Err(RegistryError::IncompletePayload { field });
        }

        Ok(Self {
            auth_method: AUTH_METHOD_EXTERNAL_ID,
            kind: INTEGRATION_TYPE_CLOUDWATCH,
            enable_aws_usage: shape.enable_aws_usage,
            enabled: shape.enabled,
            import_cloud_watch: shape.import_cloud_watch,
            metadata_poll_rate: shape.metadata_poll_rate_ms,
            name: shape.name.clone(),
            named_token: shape.named_token.clone(),
            poll_rate: shape.poll_rate_ms,
            regions: shape.regions.clone(),
            sfx_aws_account_arn: shape.sfx_aws_account_arn.clone(),
            role_arn,
            external_id,
        })
    }
}
