//! Core gateway logic.
//!
//! # Modules
//!
//! - [`registry`] - Configured upstream providers
//! - [`aggregate`] - Concurrent `$everything` fan-out with per-provider budgets
//! - [`reconcile`] - Merging provider bundles into one searchset
//! - [`access`] - Consumer access gate
//! - [`coordination`] - Request state machine tying the above together
//! - [`validation`] - Argument rule collection
//!
//! # Request Workflow
//!
//! 1. **Validate**: Check arguments and resolve the provider selection
//! 2. **Gate**: Resolve the caller and check their access grant
//! 3. **Aggregate**: Query every selected provider concurrently
//! 4. **Reconcile**: Merge successful bundles, primary provider first
//! 5. **Serialize**: Render the merged bundle as FHIR JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use fhirgate::config::load_config;
//! use fhirgate::core::coordination::{Coordinator, EverythingRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fhirgate.toml")?;
//! let coordinator = Coordinator::from_config(&config)?;
//!
//! let response = coordinator
//!     .everything(
//!         EverythingRequest::new("9434765919")
//!             .with_claim("consumer_id", "consumer-1")
//!             .with_claim("organisation_code", "RAL"),
//!     )
//!     .await?;
//!
//! println!("{} entries", response.total);
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod aggregate;
pub mod coordination;
pub mod reconcile;
pub mod registry;
pub mod validation;
