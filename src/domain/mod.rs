//! Domain models and types for fhirgate.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`PatientIdentifier`], [`ProviderName`], [`ResourceKey`])
//! - **Domain models** ([`Bundle`], [`ProviderDescriptor`], [`ProviderOutcome`])
//! - **Error types** ([`GatewayError`], [`ProviderError`], [`ValidationError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, GatewayError>`]:
//!
//! ```rust
//! use fhirgate::domain::{Component, GatewayError, Result};
//!
//! fn example(patient: &str) -> Result<()> {
//!     if patient.trim().is_empty() {
//!         return Err(GatewayError::validation(Component::Coordination, "patient is blank"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod bundle;
pub mod cancellation;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod provider;
pub mod request;
pub mod result;

// Re-export commonly used types for convenience
pub use access::{AccessDecision, CallerClaims, CallerIdentity};
pub use bundle::{Bundle, BundleEntry, BundleMeta, BundleType};
pub use cancellation::{CancellationSignal, CancellationTrigger};
pub use errors::{
    Component, ErrorKind, GatewayError, ProviderError, ProviderFailures, ValidationError,
    Violation,
};
pub use ids::{PatientIdentifier, ProviderName, ResourceKey};
pub use outcome::{OutcomeResult, ProviderOutcome};
pub use provider::{FhirVersion, ProviderDescriptor};
pub use request::{AggregationRequest, EverythingFilters};
pub use result::Result;
