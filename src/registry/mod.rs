//! Integration registry
//!
//! Create, full-replace update and delete of the SaaS-side CloudWatch
//! integration resource.

pub mod client;
pub mod payload;
pub mod trait_;

pub use client::IntegrationClient;
pub use payload::IntegrationPayload;
pub use trait_::{CreatedIntegration, DeleteOutcome, IntegrationRegistry, RegistryError};
