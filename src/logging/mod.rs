//! Logging, audit and observability
//!
//! This module provides:
//! - Structured logging with console and rotating JSON file output
//! - The audit trail for `$everything` requests
//! - Logging macros used across the gateway
//!
//! # Example
//!
//! ```no_run
//! use fhirgate::logging::init_logging;
//! use fhirgate::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Gateway started");
//! ```

pub mod audit;
pub mod structured;

// Re-export commonly used items
pub use audit::{
    create_audit_sinks, record_audit, AuditAction, AuditEvent, AuditSink, AuditTrail,
    JsonlAuditSink, TracingAuditSink,
};
pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the settled provider outcomes of one aggregation as a single event
///
/// Emitted at `info` when every provider succeeded and at `warn` otherwise.
///
/// # Example
///
/// ```no_run
/// use fhirgate::log_provider_outcomes;
/// use fhirgate::domain::ProviderOutcome;
///
/// let outcomes: Vec<ProviderOutcome> = Vec::new();
/// log_provider_outcomes!(&outcomes);
/// ```
#[macro_export]
macro_rules! log_provider_outcomes {
    ($outcomes:expr) => {{
        let outcomes: &[$crate::domain::ProviderOutcome] = $outcomes;
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let summary = outcomes
            .iter()
            .map(|o| {
                format!(
                    "{}={}({}ms)",
                    o.provider_name,
                    o.status(),
                    o.elapsed.as_millis()
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let failures = outcomes
            .iter()
            .filter_map(|o| o.failure_reason().map(|r| format!("{}: {}", o.provider_name, r)))
            .collect::<Vec<_>>()
            .join("; ");

        if succeeded == outcomes.len() {
            tracing::info!(
                providers = outcomes.len(),
                succeeded,
                outcomes = %summary,
                "Provider aggregation completed"
            );
        } else {
            tracing::warn!(
                providers = outcomes.len(),
                succeeded,
                outcomes = %summary,
                failures = %failures,
                "Provider aggregation completed with failures"
            );
        }
    }};
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use fhirgate::log_error_with_context;
/// use fhirgate::domain::GatewayError;
///
/// let error = GatewayError::configuration("Invalid config");
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
