//! Binding model
//!
//! A binding ties a SaaS integration id and its external ID to the IAM role
//! whose trust policy must carry that external ID.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a persisted binding. A missing binding is "absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingState {
    /// SaaS record exists, trust policy still holds the placeholder.
    Provisioned,
    /// SaaS record and trust policy agree on the external ID.
    Synced,
    /// A configuration push is in flight (or failed part-way).
    RotationPending,
    /// SaaS record deleted (or abandoned) and trust reverted.
    Deleted,
}

impl BindingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingState::Provisioned => "provisioned",
            BindingState::Synced => "synced",
            BindingState::RotationPending => "rotation_pending",
            BindingState::Deleted => "deleted",
        }
    }

    /// Whether the binding still refers to a live integration.
    pub fn is_active(&self) -> bool {
        !matches!(self, BindingState::Deleted)
    }
}

impl fmt::Display for BindingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown binding state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown binding state '{0}'")]
pub struct UnknownBindingState(pub String);

impl FromStr for BindingState {
    type Err = UnknownBindingState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "provisioned" => Ok(BindingState::Provisioned),
            "synced" => Ok(BindingState::Synced),
            "rotation_pending" => Ok(BindingState::RotationPending),
            "deleted" => Ok(BindingState::Deleted),
            other => Err(UnknownBindingState(other.to_string())),
        }
    }
}

/// The IAM role a binding is trusted against, plus its inert placeholder ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTarget {
    pub role_arn: String,
    pub default_external_id: String,
}

/// Persisted join record between the SaaS integration and the IAM role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub integration_id: String,
    pub current_external_id: String,
    /// Empty when the binding was loaded from a file that predates role tracking.
    pub role_arn: String,
    pub default_external_id: String,
    pub state: BindingState,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Binding {
    pub fn new(
        integration_id: impl Into<String>,
        current_external_id: impl Into<String>,
        target: &RoleTarget,
        state: BindingState,
    ) -> Self {
        Self {
            integration_id: integration_id.into(),
            current_external_id: current_external_id.into(),
            role_arn: target.role_arn.clone(),
            default_external_id: target.default_external_id.clone(),
            state,
            updated_at: Some(Utc::now()),
        }
    }

    /// Move to `state`, stamping the transition time.
    pub fn transition(&mut self, state: BindingState) {
        self.state = state;
        self.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_round_trip_through_strings() {
        for state in [
            BindingState::Provisioned,
            BindingState::Synced,
            BindingState::RotationPending,
            BindingState::Deleted,
        ] {
            assert_eq!(state.as_str().parse::<BindingState>(), Ok(state));
        }
        assert_eq!("SYNCED".parse::<BindingState>(), Ok(BindingState::Synced));
        assert!("bound".parse::<BindingState>().is_err());
    }

    #[test]
    fn only_deleted_is_inactive() {
        assert!(BindingState::Provisioned.is_active());
        assert!(BindingState::RotationPending.is_active());
        assert!(!BindingState::Deleted.is_active());
    }

    #[test]
    fn transition_updates_state_and_timestamp() {
        let target = RoleTarget {
            role_arn: "arn:aws:iam::999:role/MonitorRole".to_string(),
            default_external_id: "placeholder".to_string(),
        };
        let mut binding = Binding::new("int-1", "ext-abc", &target, BindingState::Provisioned);
        binding.updated_at = None;
        binding.transition(BindingState::Synced);
        assert_eq!(binding.state, BindingState::Synced);
        assert!(binding.updated_at.is_some());
        assert_eq!(binding.role_arn, target.role_arn);
    }
}
