//! Telemetry for the EWBI metastore
//!
//! Installs the global tracing subscriber. The library itself only emits
//! `tracing` events; binaries decide whether and how they are collected.

use crate::config::TelemetryConfig;
use crate::models::MetastoreError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), MetastoreError> {
    if !config.tracing.enabled {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(true).with_thread_ids(true));

            tracing::subscriber::set_global_default(subscriber).map_err(|e| {
                MetastoreError::ConfigurationError {
                    message: format!("Failed to set tracing subscriber: {}", e),
                }
            })?;
        }
        _ => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(true).with_thread_ids(true));

            tracing::subscriber::set_global_default(subscriber).map_err(|e| {
                MetastoreError::ConfigurationError {
                    message: format!("Failed to set tracing subscriber: {}", e),
                }
            })?;
        }
    }

    tracing::debug!(
        service = %config.tracing.service_name,
        level = %config.logging.level,
        "Tracing initialized"
    );
    Ok(())
}
