//! Providers command implementation
//!
//! Lists the configured upstream providers and whether each is currently
//! available for aggregation.

use crate::config::load_config;
use crate::core::registry::ProviderRegistry;
use chrono::Utc;
use clap::Args;

/// Arguments for the providers command
#[derive(Args, Debug)]
pub struct ProvidersArgs {
    /// Only show providers that are currently active
    #[arg(long)]
    pub active: bool,
}

impl ProvidersArgs {
    /// Execute the providers command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
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

        let now = Utc::now();
        let base_urls: std::collections::HashMap<&str, &str> = config
            .providers
            .iter()
            .map(|p| (p.name.as_str(), p.base_url.as_str()))
            .collect();

        println!("📡 Providers");
        println!();
        println!(
            "{:<16} {:<6} {:<10} {:<8} {:>8}  Base URL",
            "Name", "FHIR", "State", "Role", "Wait ms"
        );
        println!("{}", "-".repeat(72));

        for provider in registry.all() {
            let available = provider.is_available_at(now);
            if self.active && !available {
                continue;
            }

            let role = if provider.is_primary {
                "primary"
            } else if provider.is_for_comparison_only {
                "compare"
            } else {
                "-"
            };

            println!(
                "{:<16} {:<6} {:<10} {:<8} {:>8}  {}",
                provider.name.as_str(),
                provider.fhir_version.to_string(),
                if available { "active" } else { "inactive" },
                role,
                provider.max_wait_time_milliseconds,
                base_urls.get(provider.name.as_str()).copied().unwrap_or("")
            );
        }

        Ok(0)
    }
}
