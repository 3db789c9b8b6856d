//! # Lifecycle Orchestrator
//!
//! Drives the binding between a SaaS CloudWatch integration and the IAM role
//! it assumes through its states:
//!
//! ```text
//! Absent ─provision─▶ Provisioned ─bind─▶ Synced ⇄ RotationPending
//!                                           │
//!                          reset (any active state) ─▶ Deleted
//! ```
//!
//! Neither remote system is transactional with the other, so every step is
//! persisted before the next remote mutation and failures leave a binding
//! state from which the same command (or `sync`) can be re-run.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{Instrument, error, info, info_span, warn};

use crate::auth::{AccessToken, SessionAuthenticator, SessionIdentity};
use crate::config::{ConfigError, KEY_EMAIL, KEY_EXTERNAL_ID, KEY_INTEGRATION_ID, KEY_ROLE_ARN};
use crate::error::LifecycleError;
use crate::models::{Binding, BindingState, IntegrationRecord, IntegrationShape, RoleTarget};
use crate::registry::{DeleteOutcome, IntegrationRegistry, RegistryError};
use crate::store::BindingStore;
use crate::telemetry;
use crate::trust_policy::{RolePolicyApi, RotationReport, TrustPolicyError, TrustPolicySynchronizer};

/// The collaborators an [`Orchestrator`] drives.
#[derive(Clone)]
pub struct Components {
    pub auth: Arc<dyn SessionAuthenticator>,
    pub registry: Arc<dyn IntegrationRegistry>,
    pub role_policies: Arc<dyn RolePolicyApi>,
    pub store: Arc<dyn BindingStore>,
}

/// Resolved inputs for one invocation.
///
/// Only the values the requested operation needs have to be present.
#[derive(Debug, Clone, Default)]
pub struct LifecycleSettings {
    pub identity: Option<SessionIdentity>,
    pub target: Option<RoleTarget>,
    /// Seeds a binding when none is stored; must match a stored one.
    pub integration_id_override: Option<String>,
    /// Seeds a binding when none is stored; must match a stored one.
    pub external_id_override: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub binding: Binding,
    pub record: IntegrationRecord,
    pub trust: RotationReport,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub binding: Binding,
    pub trust: RotationReport,
}

#[derive(Debug, Clone)]
pub struct RotateReport {
    pub binding: Binding,
    pub record: IntegrationRecord,
}

/// What happened to the SaaS record during a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionStatus {
    Deleted,
    Rejected { status: u16, body: String },
    Failed { message: String },
}

/// What happened to the trust policy during a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustRevert {
    Reverted(RotationReport),
    /// The binding was never synced and the policy still holds the placeholder.
    AlreadyDefault,
}

#[derive(Debug, Clone)]
pub struct ResetReport {
    pub binding: Binding,
    pub deletion: DeletionStatus,
    pub trust: TrustRevert,
}

/// Runs provision, sync, rotate and reset against the configured collaborators.
pub struct Orchestrator {
    auth: Arc<dyn SessionAuthenticator>,
    registry: Arc<dyn IntegrationRegistry>,
    synchronizer: TrustPolicySynchronizer,
    store: Arc<dyn BindingStore>,
    settings: LifecycleSettings,
    run_id: String,
}

impl Orchestrator {
    pub fn new(components: Components, settings: LifecycleSettings) -> Self {
        Self {
            auth: components.auth,
            registry: components.registry,
            synchronizer: TrustPolicySynchronizer::new(components.role_policies),
            store: components.store,
            settings,
            run_id: telemetry::run_id(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Create the SaaS integration and narrow the role's trust policy to it.
    ///
    /// Once the record exists, any failure is reported as
    /// [`LifecycleError::TrustSyncFailed`] carrying the new ids; the binding is
    /// then left `Provisioned` and `sync` completes the job.
    pub async fn provision(
        &self,
        shape: &IntegrationShape,
    ) -> Result<ProvisionReport, LifecycleError> {
        self.instrumented("provision", async {
            let target = self.target()?;
            if let Some(field) = shape.missing_field() {
                return Err(RegistryError::IncompletePayload { field }.into());
            }
            if let Some(existing) = self.store.load().await?
                && existing.state.is_active()
            {
                return Err(LifecycleError::InvalidState {
                    operation: "provision",
                    state: existing.state.to_string(),
                });
            }

            let token = self.authenticate().await?;
            let created = self.registry.create(&token, shape).await?;

            let partial = |source: LifecycleError| LifecycleError::TrustSyncFailed {
                integration_id: created.id.clone(),
                external_id: created.external_id.clone(),
                source: Box::new(source),
            };

            let mut binding = Binding::new(
                &created.id,
                &created.external_id,
                target,
                BindingState::Provisioned,
            );
            self.store
                .save(&binding)
                .await
                .map_err(|e| partial(e.into()))?;

            let trust = self
                .synchronizer
                .bind_external_id(
                    &target.role_arn,
                    &target.default_external_id,
                    &created.external_id,
                )
                .await
                .map_err(|e| partial(e.into()))?;

            binding.transition(BindingState::Synced);
            self.store
                .save(&binding)
                .await
                .map_err(|e| partial(e.into()))?;

            info!(
                integration_id = %binding.integration_id,
                role_name = %trust.role_name,
                "Integration provisioned and trust policy bound"
            );
            Ok(ProvisionReport {
                binding,
                record: created.record,
                trust,
            })
        })
        .await
    }

    /// Finish a provision whose trust policy step did not complete.
    pub async fn sync(&self) -> Result<SyncReport, LifecycleError> {
        self.instrumented("sync", async {
            let target = self.target()?;
            let mut binding = self.require_binding("sync", target).await?;
            if binding.state != BindingState::Provisioned {
                return Err(LifecycleError::InvalidState {
                    operation: "sync",
                    state: binding.state.to_string(),
                });
            }

            let trust = self
                .synchronizer
                .bind_external_id(
                    &target.role_arn,
                    &target.default_external_id,
                    &binding.current_external_id,
                )
                .await?;

            binding.transition(BindingState::Synced);
            self.store.save(&binding).await?;

            info!(
                integration_id = %binding.integration_id,
                role_name = %trust.role_name,
                "Trust policy bound"
            );
            Ok(SyncReport { binding, trust })
        })
        .await
    }

    /// Push the configured integration fields, keeping the external id.
    ///
    /// A failed update leaves the binding `RotationPending`; running rotate
    /// again re-submits the same values.
    pub async fn rotate(&self, shape: &IntegrationShape) -> Result<RotateReport, LifecycleError> {
        self.instrumented("rotate", async {
            let target = self.target()?;
            if let Some(field) = shape.missing_field() {
                return Err(RegistryError::IncompletePayload { field }.into());
            }

            let mut binding = self.require_binding("rotate", target).await?;
            if !matches!(
                binding.state,
                BindingState::Synced | BindingState::RotationPending
            ) {
                return Err(LifecycleError::InvalidState {
                    operation: "rotate",
                    state: binding.state.to_string(),
                });
            }

            let token = self.authenticate().await?;

            binding.transition(BindingState::RotationPending);
            self.store.save(&binding).await?;

            let record = self
                .registry
                .update(
                    &token,
                    &binding.integration_id,
                    shape,
                    &binding.current_external_id,
                    &target.role_arn,
                )
                .await?;

            if let Some(returned) = record.external_id()
                && returned != binding.current_external_id
            {
                return Err(LifecycleError::ExternalIdDrift {
                    integration_id: binding.integration_id.clone(),
                    expected: binding.current_external_id.clone(),
                    returned: returned.to_string(),
                });
            }

            binding.transition(BindingState::Synced);
            self.store.save(&binding).await?;

            info!(integration_id = %binding.integration_id, "Integration updated");
            Ok(RotateReport { binding, record })
        })
        .await
    }

    /// Delete the SaaS record (best effort) and revert the trust policy to
    /// the placeholder external id.
    pub async fn reset(&self) -> Result<ResetReport, LifecycleError> {
        self.instrumented("reset", async {
            let target = self.target()?;
            let mut binding = self.require_binding("reset", target).await?;
            if !binding.state.is_active() {
                return Err(LifecycleError::InvalidState {
                    operation: "reset",
                    state: binding.state.to_string(),
                });
            }

            let token = self.authenticate().await?;

            let deletion = match self.registry.delete(&token, &binding.integration_id).await {
                Ok(DeleteOutcome::Deleted) => DeletionStatus::Deleted,
                Ok(DeleteOutcome::Rejected { status, body }) => {
                    warn!(
                        integration_id = %binding.integration_id,
                        status,
                        "Integration delete rejected; reverting trust policy anyway"
                    );
                    DeletionStatus::Rejected { status, body }
                }
                Err(err) => {
                    warn!(
                        integration_id = %binding.integration_id,
                        error = %err,
                        "Integration delete failed; reverting trust policy anyway"
                    );
                    DeletionStatus::Failed {
                        message: err.to_string(),
                    }
                }
            };

            let trust = match self
                .synchronizer
                .rotate_external_id(
                    &target.role_arn,
                    &binding.current_external_id,
                    &target.default_external_id,
                )
                .await
            {
                Ok(report) => TrustRevert::Reverted(report),
                Err(TrustPolicyError::ExternalIdNotFound(_))
                    if binding.state == BindingState::Provisioned =>
                {
                    info!(
                        integration_id = %binding.integration_id,
                        "Trust policy was never bound; nothing to revert"
                    );
                    TrustRevert::AlreadyDefault
                }
                Err(err) => return Err(err.into()),
            };

            binding.transition(BindingState::Deleted);
            self.store.save(&binding).await?;

            info!(integration_id = %binding.integration_id, "Binding reset");
            Ok(ResetReport {
                binding,
                deletion,
                trust,
            })
        })
        .await
    }

    async fn authenticate(&self) -> Result<AccessToken, LifecycleError> {
        let identity = self
            .settings
            .identity
            .as_ref()
            .ok_or(ConfigError::MissingValue { key: KEY_EMAIL })?;
        Ok(self.auth.authenticate(identity).await?)
    }

    fn target(&self) -> Result<&RoleTarget, LifecycleError> {
        Ok(self
            .settings
            .target
            .as_ref()
            .ok_or(ConfigError::MissingValue { key: KEY_ROLE_ARN })?)
    }

    /// Stored binding with its role checked against the configured one.
    ///
    /// Id overrides only seed a binding when none is stored; a stored binding
    /// must agree with them.
    async fn load_binding(&self, target: &RoleTarget) -> Result<Option<Binding>, LifecycleError> {
        let integration_id = self.settings.integration_id_override.as_deref();
        let external_id = self.settings.external_id_override.as_deref();

        let mut binding = match self.store.load().await? {
            Some(stored) => {
                for (key, given, held) in [
                    (KEY_INTEGRATION_ID, integration_id, &stored.integration_id),
                    (KEY_EXTERNAL_ID, external_id, &stored.current_external_id),
                ] {
                    if let Some(given) = given
                        && given != held
                    {
                        return Err(LifecycleError::OverrideConflict {
                            key,
                            stored: held.clone(),
                            given: given.to_string(),
                        });
                    }
                }
                stored
            }
            None => match (integration_id, external_id) {
                (Some(id), Some(ext)) => Binding::new(id, ext, target, BindingState::Synced),
                _ => return Ok(None),
            },
        };

        if binding.role_arn.is_empty() {
            binding.role_arn = target.role_arn.clone();
        } else if binding.role_arn != target.role_arn {
            return Err(LifecycleError::RoleMismatch {
                bound: binding.role_arn,
                configured: target.role_arn.clone(),
            });
        }
        if binding.default_external_id.is_empty() {
            binding.default_external_id = target.default_external_id.clone();
        }

        Ok(Some(binding))
    }

    async fn require_binding(
        &self,
        operation: &'static str,
        target: &RoleTarget,
    ) -> Result<Binding, LifecycleError> {
        self.load_binding(target)
            .await?
            .ok_or_else(|| LifecycleError::InvalidState {
                operation,
                state: "absent".to_string(),
            })
    }

    async fn instrumented<T, F>(&self, operation: &'static str, fut: F) -> Result<T, LifecycleError>
    where
        F: Future<Output = Result<T, LifecycleError>>,
    {
        let span = info_span!("lifecycle", operation, run_id = %self.run_id);
        let started = Instant::now();
        let result = fut.instrument(span.clone()).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.category(),
        };
        let labels = vec![("operation", operation.to_string()), ("outcome", outcome.to_string())];
        counter!("integration_sync_operations_total", &labels).increment(1);
        histogram!("integration_sync_operation_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1_000.0);

        span.in_scope(|| match &result {
            Ok(_) => info!(outcome, "Operation completed"),
            Err(err) => error!(category = err.category(), error = %err, "Operation failed"),
        });
        result
    }
}
