//! # Session Authentication
//!
//! Exchanges account credentials for the short-lived access token that every
//! integration API call carries in the `X-SF-TOKEN` header.

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::http::{body_snippet, endpoint, realm_api_base};

/// Credentials used to open a session.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionIdentity {
    pub email: String,
    pub password: String,
    pub org_id: String,
    pub realm: String,
}

impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("org_id", &self.org_id)
            .field("realm", &self.realm)
            .finish()
    }
}

/// Bearer token returned by the session endpoint.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for placing in a request header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Session authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("session request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("session response did not contain an access token")]
    MissingToken,
}

/// Opens a session for the given identity.
#[async_trait]
pub trait SessionAuthenticator: Send + Sync {
    async fn authenticate(&self, identity: &SessionIdentity) -> Result<AccessToken, AuthError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest<'a> {
    email: &'a str,
    password: &'a str,
    organization_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    access_token: Option<String>,
}

/// HTTP client for `POST /v2/session`.
pub struct SessionClient {
    http: reqwest::Client,
    api_base: Option<String>,
}

impl SessionClient {
    /// Client that derives the API host from the identity's realm.
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            api_base: None,
        }
    }

    /// Client pinned to an explicit API base (proxies, mock servers).
    pub fn with_api_base(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: Some(api_base.into()),
        }
    }

    fn session_url(&self, realm: &str) -> String {
        let base = self
            .api_base
            .clone()
            .unwrap_or_else(|| realm_api_base(realm));
        endpoint(&base, "v2/session")
    }
}

#[async_trait]
impl SessionAuthenticator for SessionClient {
    async fn authenticate(&self, identity: &SessionIdentity) -> Result<AccessToken, AuthError> {
        let url = self.session_url(&identity.realm);
        debug!(realm = %identity.realm, org_id = %identity.org_id, "Opening session");

        let resp = self
            .http
            .post(&url)
            .json(&SessionRequest {
                email: &identity.email,
                password: &identity.password,
                organization_id: &identity.org_id,
            })
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body: body_snippet(body),
            });
        }

        let session: SessionResponse = resp.json().await?;
        let token = session
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        info!(realm = %identity.realm, "Session opened");
        Ok(AccessToken::new(token))
    }
}
