//! Validate config command implementation
//!
//! Loads the configuration file, checks it, and builds the provider
//! registry so inconsistencies surface before the gateway serves traffic.

use crate::config::{load_config, redact_connection_string, AccessBackend};
use crate::core::registry::ProviderRegistry;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates the schema
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let registry = match ProviderRegistry::from_config(&config) {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Provider registry is inconsistent");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!(
            "  Providers: {} configured, {} active",
            registry.len(),
            registry.list_active().len()
        );
        println!(
            "  Primary Provider: {}",
            config
                .gateway
                .default_primary_provider
                .as_ref()
                .map(|p| p.to_string())
                .or_else(|| registry.primary().map(|p| p.name.to_string()))
                .unwrap_or_else(|| "(first successful)".to_string())
        );
        println!(
            "  Hashed Identifiers: {}",
            config.gateway.use_hashed_nhs_number
        );
        match config.access.backend {
            AccessBackend::Memory => {
                println!("  Access Backend: memory ({} grants)", config.access.grants.len())
            }
            AccessBackend::PostgreSQL => {
                println!("  Access Backend: postgresql");
                if let Some(pg) = &config.access.postgresql {
                    println!(
                        "  PostgreSQL Connection: {}",
                        redact_connection_string(&pg.connection_string)
                    );
                    println!("  Max Connections: {}", pg.max_connections);
                }
            }
        }
        println!(
            "  Audit File: {}",
            if config.audit.file_enabled {
                config.audit.path.as_str()
            } else {
                "disabled"
            }
        );
        println!();

        Ok(0)
    }
}
