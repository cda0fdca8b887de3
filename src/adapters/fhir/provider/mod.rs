//! FHIR provider implementations
//!
//! The `FhirProvider` trait defines the common interface; `RestFhirProvider`
//! talks to R4 and STU3 servers over HTTP.

pub mod rest;
mod r#trait;

pub use r#trait::FhirProvider;
pub use rest::{ProviderAuth, RestFhirProvider};
