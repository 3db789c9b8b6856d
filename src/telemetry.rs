//! Global subscriber management and per-run correlation ids.

use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tracing_log::LogTracer;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt};

use crate::config::AppConfig;

/// Errors that can occur while initializing global telemetry.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install log tracer bridge: {0}")]
    LogTracer(#[from] log::SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the stderr subscriber for this process and route `log` records
/// from reqwest and the AWS SDK into it. Later calls are no-ops.
///
/// `RUST_LOG`, when set, replaces the configured filter.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if TELEMETRY_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let output = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let output = if config.log_format == "json" {
        output.json().boxed()
    } else {
        output.pretty().boxed()
    };

    let installed = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
        .map_err(TelemetryInitError::from)
        .and_then(|()| {
            let subscriber = tracing_subscriber::registry().with(filter).with(output);
            tracing::subscriber::set_global_default(subscriber).map_err(TelemetryInitError::from)
        });
    if installed.is_err() {
        TELEMETRY_INITIALIZED.store(false, Ordering::SeqCst);
    }
    installed
}

/// Fresh correlation id for one CLI invocation, e.g. `run-1a2b3c4d`.
pub fn run_id() -> String {
    format!("run-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}
