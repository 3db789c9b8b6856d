//! Integration registry trait definition

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::AccessToken;
use crate::models::{IntegrationRecord, IntegrationShape};

fn created_note(integration_id: &Option<String>) -> String {
    match integration_id {
        Some(id) => format!(" (integration {} was created)", id),
        None => String::new(),
    }
}

/// Registry client failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("integration API returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("integration API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("integration response is missing '{field}'{}", created_note(.integration_id))]
    MissingField {
        field: &'static str,
        /// Set when the record was created but came back without an external ID.
        integration_id: Option<String>,
    },

    #[error("integration response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("refusing to send integration payload without '{field}'")]
    IncompletePayload { field: &'static str },
}

/// A freshly created integration with its backend-assigned identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedIntegration {
    pub id: String,
    pub external_id: String,
    pub record: IntegrationRecord,
}

/// Result of a delete call. Non-204 answers are reported, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Rejected { status: u16, body: String },
}

/// Token-authenticated operations on the integration resource.
#[async_trait]
pub trait IntegrationRegistry: Send + Sync {
    /// Create an integration; the backend assigns `id` and `externalId`.
    async fn create(
        &self,
        token: &AccessToken,
        shape: &IntegrationShape,
    ) -> Result<CreatedIntegration, RegistryError>;

    /// Replace every field of integration `id`.
    async fn update(
        &self,
        token: &AccessToken,
        id: &str,
        shape: &IntegrationShape,
        external_id: &str,
        role_arn: &str,
    ) -> Result<IntegrationRecord, RegistryError>;

    /// Delete integration `id`.
    async fn delete(&self, token: &AccessToken, id: &str) -> Result<DeleteOutcome, RegistryError>;
}
