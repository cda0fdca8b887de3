//! FHIR provider adapter
//!
//! This module provides the integration with upstream FHIR servers: the
//! provider trait, the REST implementation and the client factory.

pub mod client;
pub mod provider;

pub use client::ProviderClients;
pub use provider::{FhirProvider, ProviderAuth, RestFhirProvider};
