//! Binding store
//!
//! Durable record of the current binding, read and written between separate
//! invocations of provision, rotate and reset.

pub mod memory;
pub mod shell_env;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Binding;

pub use memory::MemoryBindingStore;
pub use shell_env::ShellEnvBindingStore;

/// Binding store failures.
#[derive(Debug, Error)]
pub enum BindingStoreError {
    #[error("failed to access binding file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse binding file {path}: {source}")]
    Parse {
        path: String,
        source: dotenvy::Error,
    },

    #[error("binding file {path} is missing {key}")]
    Incomplete { path: String, key: &'static str },

    #[error("binding file {path} has invalid {key}: {reason}")]
    InvalidValue {
        path: String,
        key: &'static str,
        reason: String,
    },

    #[error("value for {key} cannot be written to a shell file: {reason}")]
    UnsafeValue { key: &'static str, reason: String },
}

/// Persistence for the binding. `None` means no binding exists.
#[async_trait]
pub trait BindingStore: Send + Sync {
    async fn load(&self) -> Result<Option<Binding>, BindingStoreError>;

    async fn save(&self, binding: &Binding) -> Result<(), BindingStoreError>;

    /// Human-readable location, shown to the operator.
    fn location(&self) -> String;
}
