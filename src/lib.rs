// fhirgate - FHIR $everything Aggregation Gateway
// Copyright (c) 2025 fhirgate Contributors
// Licensed under the MIT License

//! # fhirgate - FHIR `$everything` Aggregation Gateway
//!
//! fhirgate answers a patient `$everything` request by querying several
//! upstream FHIR providers (R4 and STU3) at once and returning a single
//! reconciled `searchset` bundle.
//!
//! ## Overview
//!
//! This library provides:
//! - **Aggregating** `$everything` bundles from every selected provider
//!   concurrently, each under its own wait budget
//! - **Reconciling** the bundles by `resourceType/id`, with the primary
//!   provider winning conflicts
//! - **Gating** access per consumer and organisation, optionally against a
//!   peppered SHA-256 hash of the patient identifier
//! - **Auditing** each request without recording the plain identifier
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Registry, aggregation, reconciliation, access and coordination
//! - [`adapters`] - FHIR provider clients and access stores
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and the audit trail
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fhirgate::config::load_config;
//! use fhirgate::core::coordination::{Coordinator, EverythingRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("fhirgate.toml")?;
//!     let coordinator = Coordinator::from_config(&config)?;
//!
//!     let request = EverythingRequest::new("9434765919")
//!         .with_claim("consumer_id", "consumer-1")
//!         .with_claim("organisation_code", "RAL")
//!         .with_providers(["DDS", "LDS"])
//!         .with_primary("DDS");
//!
//!     let response = coordinator.everything(request).await?;
//!     println!("{}", response.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`domain::Result`], carrying a single
//! [`domain::GatewayError`]. Its [`domain::ErrorKind`] tells the boundary how
//! to answer; the error is logged exactly once on its way out.
//!
//! ```rust
//! use fhirgate::domain::{Component, ErrorKind, GatewayError};
//!
//! let err = GatewayError::forbidden(Component::Access, "no active grant").logged();
//! assert_eq!(err.kind(), ErrorKind::Forbidden);
//! assert!(err.is_logged());
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
