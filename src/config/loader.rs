//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{AccessBackend, GatewayConfig};
use super::secret::secret_string;
use crate::domain::errors::GatewayError;
use crate::domain::result::Result;
use crate::domain::ProviderName;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into GatewayConfig
/// 4. Applies environment variable overrides (FHIRGATE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a `Configuration` error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use fhirgate::config::loader::load_config;
///
/// let config = load_config("fhirgate.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<GatewayConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(GatewayError::configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        GatewayError::configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_from_str(&contents)
}

/// Same as [`load_config`] but from an in-memory TOML document
pub fn load_config_from_str(contents: &str) -> Result<GatewayConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: GatewayConfig = toml::from_str(&contents)
        .map_err(|e| GatewayError::configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        GatewayError::configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| GatewayError::configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(GatewayError::configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies environment variable overrides using FHIRGATE_* prefix
///
/// Environment variables follow the pattern: FHIRGATE_<SECTION>_<KEY>
/// For example: FHIRGATE_GATEWAY_PEPPER, FHIRGATE_LOGGING_LOCAL_PATH
fn apply_env_overrides(config: &mut GatewayConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("FHIRGATE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("FHIRGATE_APPLICATION_PRETTY_OUTPUT") {
        config.application.pretty_output = val.parse().unwrap_or(false);
    }

    // Gateway overrides
    if let Ok(val) = std::env::var("FHIRGATE_GATEWAY_DEFAULT_PRIMARY_PROVIDER") {
        let name = ProviderName::new(val).map_err(|e| {
            GatewayError::configuration(format!("FHIRGATE_GATEWAY_DEFAULT_PRIMARY_PROVIDER: {e}"))
        })?;
        config.gateway.default_primary_provider = Some(name);
    }
    if let Ok(val) = std::env::var("FHIRGATE_GATEWAY_USE_HASHED_NHS_NUMBER") {
        config.gateway.use_hashed_nhs_number = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FHIRGATE_GATEWAY_PEPPER") {
        config.gateway.pepper = Some(secret_string(val));
    }

    // Access overrides
    if let Some(ref mut pg) = config.access.postgresql {
        if let Ok(val) = std::env::var("FHIRGATE_ACCESS_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
    }
    if let Ok(val) = std::env::var("FHIRGATE_ACCESS_BACKEND") {
        config.access.backend = match val.to_lowercase().as_str() {
            "memory" => AccessBackend::Memory,
            "postgresql" => AccessBackend::PostgreSQL,
            other => {
                return Err(GatewayError::configuration(format!(
                    "FHIRGATE_ACCESS_BACKEND must be 'memory' or 'postgresql', got '{other}'"
                )));
            }
        };
    }

    // Audit overrides
    if let Ok(val) = std::env::var("FHIRGATE_AUDIT_FILE_ENABLED") {
        config.audit.file_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FHIRGATE_AUDIT_PATH") {
        config.audit.path = val;
    }
    if let Ok(val) = std::env::var("FHIRGATE_AUDIT_PEPPER") {
        config.audit.pepper = Some(secret_string(val));
    }

    // Logging overrides
    if let Ok(val) = std::env::var("FHIRGATE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("FHIRGATE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("FHIRGATE_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
