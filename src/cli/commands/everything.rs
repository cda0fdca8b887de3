//! Everything command implementation
//!
//! Runs one `$everything` request through the coordinator and writes the
//! merged bundle to stdout or a file.

use super::exit_code;
use crate::config::load_config;
use crate::core::coordination::{Coordinator, EverythingRequest};
use crate::domain::access::{CONSUMER_ID_CLAIM, ORGANISATION_CLAIM};
use crate::domain::CancellationSignal;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the everything command
#[derive(Args, Debug)]
pub struct EverythingArgs {
    /// Patient identifier (NHS number)
    #[arg(long)]
    pub patient: String,

    /// Care date range start (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_instant)]
    pub start: Option<DateTime<FixedOffset>>,

    /// Care date range end (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_instant)]
    pub end: Option<DateTime<FixedOffset>>,

    /// Comma separated resource types
    #[arg(long = "type")]
    pub type_filter: Option<String>,

    /// Only resources updated after this instant (R4 providers only)
    #[arg(long, value_parser = parse_instant)]
    pub since: Option<DateTime<FixedOffset>>,

    /// Page size hint passed to providers
    #[arg(long)]
    pub count: Option<u32>,

    /// Provider to query; repeat for several. Defaults to every active provider
    #[arg(long = "provider")]
    pub providers: Vec<String>,

    /// Provider whose records win conflicts
    #[arg(long)]
    pub primary: Option<String>,

    /// Consumer id presented as the caller
    #[arg(long, env = "FHIRGATE_CONSUMER_ID")]
    pub consumer: Option<String>,

    /// Organisation code presented as the caller
    #[arg(long, env = "FHIRGATE_ORGANISATION_CODE")]
    pub organisation: Option<String>,

    /// Write the bundle to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl EverythingArgs {
    /// Builds the coordinator request from the command line
    pub fn to_request(&self, cancellation: CancellationSignal) -> EverythingRequest {
        let mut request = EverythingRequest {
            patient_identifier: self.patient.clone(),
            start: self.start,
            end: self.end,
            type_filter: self.type_filter.clone(),
            since: self.since,
            count: self.count,
            primary_provider: self.primary.clone(),
            providers: self.providers.clone(),
            cancellation,
            ..Default::default()
        };

        if let Some(consumer) = &self.consumer {
            request = request.with_claim(CONSUMER_ID_CLAIM, consumer.as_str());
        }
        if let Some(organisation) = &self.organisation {
            request = request.with_claim(ORGANISATION_CLAIM, organisation.as_str());
        }

        request
    }

    /// Execute the everything command
    pub async fn execute(
        &self,
        config_path: &str,
        cancellation: CancellationSignal,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting everything command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to load configuration file");
                eprintln!("   Error: {e}");
                return Ok(2);
            }
        };

        let coordinator = match Coordinator::from_config(&config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to initialise gateway");
                eprintln!("   Error: {e}");
                return Ok(exit_code(e.kind()));
            }
        };

        let response = match coordinator.everything(self.to_request(cancellation)).await {
            Ok(r) => r,
            Err(e) => {
                eprintln!("❌ Request failed: {}", e.public_message());
                for violation in e.violations() {
                    eprintln!("   {}: {}", violation.field, violation.message);
                }
                for (provider, reason) in e.provider_failures() {
                    eprintln!("   {provider}: {reason}");
                }
                return Ok(exit_code(e.kind()));
            }
        };

        match &self.output {
            Some(path) => {
                std::fs::write(path, &response.body)?;
                eprintln!("✅ Wrote {} entries to {}", response.total, path.display());
            }
            None => println!("{}", response.body),
        }

        for (provider, status) in &response.provider_statuses {
            eprintln!("   {provider}: {status}");
        }

        Ok(0)
    }
}

/// Parses an RFC 3339 instant or a plain date taken as UTC midnight
pub fn parse_instant(value: &str) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| DateTime::<FixedOffset>::from(Utc.from_utc_datetime(&midnight)))
        .ok_or_else(|| format!("'{value}' is not an RFC 3339 instant or YYYY-MM-DD date"))
}
