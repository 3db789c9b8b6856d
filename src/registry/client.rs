//! HTTP implementation of the integration registry
//!
//! Talks to `/v2/integration` with the session token in `X-SF-TOKEN`. No
//! retries: every call is a user-triggered administrative mutation.

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Response, StatusCode};
use tracing::{debug, info, warn};

use crate::auth::AccessToken;
use crate::http::{SF_TOKEN_HEADER, body_snippet, endpoint};
use crate::models::{IntegrationRecord, IntegrationShape};
use crate::registry::{
    CreatedIntegration, DeleteOutcome, IntegrationPayload, IntegrationRegistry, RegistryError,
};

/// Bytes escaped when an integration id becomes a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Integration API client bound to one API base URL.
pub struct IntegrationClient {
    http: reqwest::Client,
    api_base: String,
}

impl IntegrationClient {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }

    fn collection_url(&self) -> String {
        endpoint(&self.api_base, "v2/integration")
    }

    fn item_url(&self, id: &str) -> String {
        let id = utf8_percent_encode(id, PATH_SEGMENT);
        endpoint(&self.api_base, &format!("v2/integration/{}", id))
    }

    async fn read_record(resp: Response) -> Result<IntegrationRecord, RegistryError> {
        let status = resp.status();
        let body = resp.text().await?;
        if status != StatusCode::OK {
            return Err(RegistryError::Http {
                status: status.as_u16(),
                body: body_snippet(body),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl IntegrationRegistry for IntegrationClient {
    async fn create(
        &self,
        token: &AccessToken,
        shape: &IntegrationShape,
    ) -> Result<CreatedIntegration, RegistryError> {
        let payload = IntegrationPayload::for_create(shape)?;
        debug!(name = %shape.name, regions = ?shape.regions, "Creating integration");

        let resp = self
            .http
            .post(self.collection_url())
            .header(SF_TOKEN_HEADER, token.expose())
            .json(&payload)
            .send()
            .await?;
        let record = Self::read_record(resp).await?;

        let id = record
            .id()
            .map(str::to_string)
            .ok_or(RegistryError::MissingField {
                field: "id",
                integration_id: None,
            })?;
        let external_id =
            record
                .external_id()
                .map(str::to_string)
                .ok_or_else(|| RegistryError::MissingField {
                    field: "externalId",
                    integration_id: Some(id.clone()),
                })?;

        info!(integration_id = %id, "Integration created");
        Ok(CreatedIntegration {
            id,
            external_id,
            record,
        })
    }

    async fn update(
        &self,
        token: &AccessToken,
        id: &str,
        shape: &IntegrationShape,
        external_id: &str,
        role_arn: &str,
    ) -> Result<IntegrationRecord, RegistryError> {
        let payload = IntegrationPayload::for_update(shape, external_id, role_arn)?;
        debug!(integration_id = %id, regions = ?shape.regions, "Replacing integration");

        let resp = self
            .http
            .put(self.item_url(id))
            .header(SF_TOKEN_HEADER, token.expose())
            .json(&payload)
            .send()
            .await?;
        let record = Self::read_record(resp).await?;

        info!(integration_id = %id, "Integration updated");
        Ok(record)
    }

    async fn delete(&self, token: &AccessToken, id: &str) -> Result<DeleteOutcome, RegistryError> {
        let resp = self
            .http
            .delete(self.item_url(id))
            .header(SF_TOKEN_HEADER, token.expose())
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            info!(integration_id = %id, "Integration deleted");
            return Ok(DeleteOutcome::Deleted);
        }

        let body = resp.text().await.unwrap_or_default();
        warn!(integration_id = %id, status = status.as_u16(), "Integration delete was not accepted");
        Ok(DeleteOutcome::Rejected {
            status: status.as_u16(),
            body: body_snippet(body),
        })
    }
}
