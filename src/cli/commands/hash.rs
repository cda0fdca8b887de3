//! Hash command implementation
//!
//! Prints the identifier exactly as the access store is queried with it,
//! so operators can seed grant tables when hashing is enabled.

use crate::config::load_config;
use crate::core::access::hash_identifier;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the hash command
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Patient identifier to hash
    #[arg(long)]
    pub identifier: String,
}

impl HashArgs {
    /// Execute the hash command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to load configuration file");
                eprintln!("   Error: {e}");
                return Ok(2);
            }
        };

        let identifier = self.identifier.trim();
        if identifier.is_empty() {
            eprintln!("❌ Identifier must not be blank");
            return Ok(2);
        }

        match (&config.gateway.pepper, config.gateway.use_hashed_nhs_number) {
            (Some(pepper), true) => {
                println!(
                    "{}",
                    hash_identifier(identifier, pepper.expose_secret().as_ref())
                );
            }
            _ => {
                eprintln!("ℹ️  Identifier hashing is disabled; grants use the plain identifier");
                println!("{identifier}");
            }
        }

        Ok(0)
    }
}
