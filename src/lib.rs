//! # Integration Sync Library
//!
//! Provisions, rotates and tears down a CloudWatch monitoring integration and
//! keeps its external ID in step with the trust policy of the polled IAM role.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod models;
pub mod registry;
pub mod store;
pub mod telemetry;
pub mod trust_policy;

pub use error::LifecycleError;
pub use lifecycle::{Components, LifecycleSettings, Orchestrator};
