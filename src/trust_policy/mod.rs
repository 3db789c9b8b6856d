//! Trust policy synchronizer
//!
//! Points the `sts:ExternalId` condition of an IAM role's trust policy at a new
//! value. The read-modify-write is not atomic with respect to other writers of
//! the same role; a single writer per role is assumed.

pub mod document;
pub mod iam;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

pub use document::{EXTERNAL_ID_CONDITION_KEY, TrustPolicyDocument};
pub use iam::{IamRolePolicyApi, RolePolicyApi};

/// Trust policy synchronization failures.
#[derive(Debug, Error)]
pub enum TrustPolicyError {
    #[error("ExternalId {0} not found in the current trust policy")]
    ExternalIdNotFound(String),

    #[error(
        "ExternalId {external_id} would be carried by {statements} statements of role {role_name}; expected exactly one"
    )]
    AmbiguousExternalId {
        role_name: String,
        external_id: String,
        statements: usize,
    },

    #[error("cannot derive a role name from '{0}'")]
    InvalidRoleArn(String),

    #[error("malformed trust policy document: {0}")]
    MalformedDocument(String),

    #[error("IAM {operation} failed for role {role_name}: {message}")]
    Iam {
        operation: &'static str,
        role_name: String,
        code: Option<String>,
        message: String,
    },
}

/// Summary of a successful rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    pub role_name: String,
    pub statements_rewritten: usize,
}

/// Role name is the final `/`-delimited segment of the role ARN, which also
/// strips any IAM path (`role/service/Name` → `Name`).
pub fn role_name_from_arn(role_arn: &str) -> Result<&str, TrustPolicyError> {
    let trimmed = role_arn.trim();
    match trimmed.rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => Ok(name),
        _ => Err(TrustPolicyError::InvalidRoleArn(role_arn.to_string())),
    }
}

/// Rewrites external IDs in role trust policies.
#[derive(Clone)]
pub struct TrustPolicySynchronizer {
    api: Arc<dyn RolePolicyApi>,
}

impl TrustPolicySynchronizer {
    pub fn new(api: Arc<dyn RolePolicyApi>) -> Self {
        Self { api }
    }

    /// Replace `old_external_id` with `new_external_id` in every statement
    /// that carries it, then write the whole document back.
    ///
    /// Fails with [`TrustPolicyError::ExternalIdNotFound`] without writing when
    /// no statement carries the old value, so a second identical call fails
    /// instead of silently succeeding.
    pub async fn rotate_external_id(
        &self,
        role_arn: &str,
        old_external_id: &str,
        new_external_id: &str,
    ) -> Result<RotationReport, TrustPolicyError> {
        self.rewrite(role_arn, old_external_id, new_external_id, false)
            .await
    }

    /// Like [`rotate_external_id`](Self::rotate_external_id), but additionally
    /// requires that exactly one statement carries `new_external_id` afterwards.
    pub async fn bind_external_id(
        &self,
        role_arn: &str,
        old_external_id: &str,
        new_external_id: &str,
    ) -> Result<RotationReport, TrustPolicyError> {
        self.rewrite(role_arn, old_external_id, new_external_id, true)
            .await
    }

    /// Current trust policy of the role.
    pub async fn fetch(&self, role_arn: &str) -> Result<TrustPolicyDocument, TrustPolicyError> {
        let role_name = role_name_from_arn(role_arn)?;
        let raw = self.api.get_assume_role_policy(role_name).await?;
        TrustPolicyDocument::parse(&raw)
    }

    async fn rewrite(
        &self,
        role_arn: &str,
        old_external_id: &str,
        new_external_id: &str,
        require_unique: bool,
    ) -> Result<RotationReport, TrustPolicyError> {
        let role_name = role_name_from_arn(role_arn)?;
        let raw = self.api.get_assume_role_policy(role_name).await?;
        let mut document = TrustPolicyDocument::parse(&raw)?;
        debug!(role_name, policy = %document.to_pretty_json(), "Current trust policy");

        let statements_rewritten = document.replace_external_id(old_external_id, new_external_id);
        if statements_rewritten == 0 {
            return Err(TrustPolicyError::ExternalIdNotFound(
                old_external_id.to_string(),
            ));
        }

        if require_unique {
            let carrying = document.statements_with(new_external_id);
            if carrying != 1 {
                return Err(TrustPolicyError::AmbiguousExternalId {
                    role_name: role_name.to_string(),
                    external_id: new_external_id.to_string(),
                    statements: carrying,
                });
            }
        }

        debug!(role_name, policy = %document.to_pretty_json(), "Updated trust policy");
        self.api
            .update_assume_role_policy(role_name, &document.to_json())
            .await?;

        info!(role_name, statements_rewritten, "Trust policy updated");
        Ok(RotationReport {
            role_name: role_name.to_string(),
            statements_rewritten,
        })
    }
}
