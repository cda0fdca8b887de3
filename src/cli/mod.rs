//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for fhirgate using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// fhirgate - FHIR `$everything` aggregation gateway
#[derive(Parser, Debug)]
#[command(name = "fhirgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fhirgate.toml", env = "FHIRGATE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FHIRGATE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and merge a patient's records from the configured providers
    Everything(commands::everything::EverythingArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// List configured providers and their state
    Providers(commands::providers::ProvidersArgs),

    /// Print the peppered hash used for access lookups
    Hash(commands::hash::HashArgs),
}
