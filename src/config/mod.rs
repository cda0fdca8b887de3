//! Configuration management for fhirgate.
//!
//! # Overview
//!
//! fhirgate uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `FHIRGATE_*` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fhirgate::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fhirgate.toml")?;
//!
//! for provider in &config.providers {
//!     println!("{} -> {}", provider.name, provider.base_url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and output settings
//! - [`GatewaySettings`] - Default primary provider and identifier hashing
//! - [`ProviderConfig`] - One `[[providers]]` entry per upstream FHIR server
//! - [`AccessConfig`] - Consumer access grants (memory or PostgreSQL)
//! - [`AuditConfig`] - Audit trail file
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [gateway]
//! use_hashed_nhs_number = true
//! pepper = "${FHIRGATE_PEPPER}"
//!
//! [[providers]]
//! name = "DDS"
//! base_url = "https://dds.example.nhs.uk/fhir"
//! is_primary = true
//! max_wait_time_milliseconds = 5000
//!
//! [[providers]]
//! name = "LDS"
//! base_url = "https://lds.example.nhs.uk/fhir"
//! fhir_version = "STU3"
//! auth_type = "bearer"
//! token = "${FHIRGATE_LDS_TOKEN}"
//!
//! [access]
//! backend = "memory"
//!
//! [[access.grants]]
//! consumer_id = "consumer-1"
//! organisation_code = "RAL"
//! patients = ["9434765919"]
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_from_str};
pub use schema::{
    AccessBackend, AccessConfig, AccessGrantConfig, ApplicationConfig, AuditConfig, Environment,
    GatewayConfig, GatewaySettings, LoggingConfig, PostgreSQLConfig, ProviderConfig,
};
pub use secret::{
    redact_connection_string, secret_string, secret_string_opt, SecretString, SecretValue,
};
