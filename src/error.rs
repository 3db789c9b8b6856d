//! # Error Handling
//!
//! Every component reports its own error enum; [`LifecycleError`] gathers them
//! for the orchestrator and maps each failure onto a stable category and a
//! process exit code.

use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::registry::RegistryError;
use crate::store::BindingStoreError;
use crate::trust_policy::TrustPolicyError;

/// Failure of a lifecycle operation.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    TrustPolicy(#[from] TrustPolicyError),

    #[error(transparent)]
    Store(#[from] BindingStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot {operation} while the binding is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("{key}={given} disagrees with the stored binding ({stored}); edit or remove the binding file instead")]
    OverrideConflict {
        key: &'static str,
        stored: String,
        given: String,
    },

    #[error("binding belongs to role {bound}, but {configured} is configured")]
    RoleMismatch { bound: String, configured: String },

    #[error(
        "integration {integration_id} came back with externalId {returned}, expected {expected}"
    )]
    ExternalIdDrift {
        integration_id: String,
        expected: String,
        returned: String,
    },

    /// The SaaS record exists but the trust policy was not narrowed to it.
    #[error(
        "integration {integration_id} was created with externalId {external_id}, but the trust policy was not updated: {source}"
    )]
    TrustSyncFailed {
        integration_id: String,
        external_id: String,
        source: Box<LifecycleError>,
    },
}

impl LifecycleError {
    /// Stable short name of the failure class, used in logs, metrics and CLI output.
    pub fn category(&self) -> &'static str {
        match self {
            LifecycleError::Auth(AuthError::Rejected { .. }) => "auth",
            LifecycleError::Auth(AuthError::Transport(_)) => "transport",
            LifecycleError::Auth(AuthError::MissingToken) => "missing_field",
            LifecycleError::Registry(err) => match err {
                RegistryError::Http { .. } => "http",
                RegistryError::Transport(_) => "transport",
                RegistryError::MissingField { .. }
                | RegistryError::Decode(_)
                | RegistryError::IncompletePayload { .. } => "missing_field",
            },
            LifecycleError::TrustPolicy(err) => match err {
                TrustPolicyError::ExternalIdNotFound(_) => "external_id_not_found",
                TrustPolicyError::Iam { .. } => "aws",
                TrustPolicyError::AmbiguousExternalId { .. }
                | TrustPolicyError::InvalidRoleArn(_)
                | TrustPolicyError::MalformedDocument(_) => "policy",
            },
            LifecycleError::Store(_) => "store",
            LifecycleError::Config(_) => "config",
            LifecycleError::InvalidState { .. } => "invalid_state",
            LifecycleError::RoleMismatch { .. } | LifecycleError::OverrideConflict { .. } => {
                "config"
            }
            LifecycleError::ExternalIdDrift { .. } => "http",
            LifecycleError::TrustSyncFailed { source, .. } => source.category(),
        }
    }

    /// Process exit code: 2 auth, 3 network, 4 validation, 5 server, 1 anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            LifecycleError::Registry(RegistryError::Http { status, .. }) => {
                if *status >= 500 {
                    5
                } else if *status == 401 || *status == 403 {
                    2
                } else {
                    4
                }
            }
            LifecycleError::TrustSyncFailed { source, .. } => source.exit_code(),
            _ => match self.category() {
                "auth" => 2,
                "transport" | "aws" => 3,
                "config" | "invalid_state" | "missing_field" | "external_id_not_found"
                | "policy" => 4,
                "http" => 5,
                _ => 1,
            },
        }
    }

    /// Integration that exists remotely despite the failure.
    pub fn created_integration_id(&self) -> Option<&str> {
        match self {
            LifecycleError::TrustSyncFailed { integration_id, .. } => Some(integration_id.as_str()),
            LifecycleError::Registry(RegistryError::MissingField {
                integration_id: Some(id),
                ..
            }) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Integration and external ID that exist remotely despite the failure.
    pub fn partial_ids(&self) -> Option<(&str, &str)> {
        match self {
            LifecycleError::TrustSyncFailed {
                integration_id,
                external_id,
                ..
            } => Some((integration_id, external_id)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejection_is_an_auth_failure() {
        let err = LifecycleError::from(AuthError::Rejected {
            status: 401,
            body: "bad credentials".to_string(),
        });
        assert_eq!(err.category(), "auth");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn http_status_picks_exit_code() {
        let http = |status| {
            LifecycleError::from(RegistryError::Http {
                status,
                body: String::new(),
            })
        };
        assert_eq!(http(500).exit_code(), 5);
        assert_eq!(http(403).exit_code(), 2);
        assert_eq!(http(400).exit_code(), 4);
        assert_eq!(http(400).category(), "http");
    }

    #[test]
    fn external_id_not_found_is_its_own_category() {
        let err = LifecycleError::from(TrustPolicyError::ExternalIdNotFound("ext-zzz".into()));
        assert_eq!(err.category(), "external_id_not_found");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn incomplete_payload_is_a_missing_field() {
        let err = LifecycleError::from(RegistryError::IncompletePayload { field: "roleArn" });
        assert_eq!(err.category(), "missing_field");
    }

    #[test]
    fn trust_sync_failure_reports_ids_and_inner_category() {
        let err = LifecycleError::TrustSyncFailed {
            integration_id: "int-1".to_string(),
            external_id: "ext-abc".to_string(),
            source: Box::new(LifecycleError::from(TrustPolicyError::Iam {
                operation: "GetRole",
                role_name: "MonitorRole".to_string(),
                code: Some("AccessDenied".to_string()),
                message: "denied".to_string(),
            })),
        };
        assert_eq!(err.category(), "aws");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.partial_ids(), Some(("int-1", "ext-abc")));
        assert!(err.to_string().contains("ext-abc"));
    }

    #[test]
    fn invalid_state_names_operation() {
        let err = LifecycleError::InvalidState {
            operation: "rotate",
            state: "absent".to_string(),
        };
        assert_eq!(err.to_string(), "cannot rotate while the binding is absent");
        assert_eq!(err.category(), "invalid_state");
    }
}
