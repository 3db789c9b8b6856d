//! # Data Models
//!
//! Types shared between the SaaS integration client, the trust policy
//! synchronizer and the binding store.

pub mod binding;
pub mod integration;

pub use binding::{Binding, BindingState, RoleTarget};
pub use integration::{IntegrationRecord, IntegrationShape};
