// fhirgate - FHIR $everything Aggregation Gateway
// Copyright (c) 2025 fhirgate Contributors
// Licensed under the MIT License

use fhirgate::cli::{Cli, Commands};
use fhirgate::config::{load_config, LoggingConfig};
use fhirgate::domain::CancellationSignal;
use fhirgate::logging::init_logging;
use clap::Parser;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // File logging and the default level come from the config file when it
    // loads; commands report config errors themselves.
    let file_config = load_config(&cli.config).ok();
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let logging_config = file_config
        .map(|c| c.logging)
        .unwrap_or_else(LoggingConfig::default);

    let guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "fhirgate - FHIR $everything Aggregation Gateway"
    );

    // Cancellation reaches in-flight provider calls through this channel
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT (Ctrl+C), cancelling request...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, cancelling request...");
                }
            }
            eprintln!("\n⚠️  Shutdown signal received, cancelling in-flight provider calls...");
            let _ = cancel_tx.send(true);
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Received SIGINT (Ctrl+C), cancelling request...");
                eprintln!("\n⚠️  Shutdown signal received, cancelling in-flight provider calls...");
                let _ = cancel_tx.send(true);
            }
        }
    });

    let exit_code = match execute_command(&cli, CancellationSignal::new(cancel_rx)).await {
        Ok(code) => code,
        Err(e) => {
            fhirgate::log_error_with_context!(e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    // process::exit skips destructors; flush the file writer first
    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, cancellation: CancellationSignal) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Everything(args) => args.execute(&cli.config, cancellation).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Providers(args) => args.execute(&cli.config).await,
        Commands::Hash(args) => args.execute(&cli.config).await,
    }
}
