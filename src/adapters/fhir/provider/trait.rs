//! FHIR provider trait definition
//!
//! This module defines the `FhirProvider` trait that abstracts the wire quirks
//! of each upstream FHIR server (dialect, authentication, URL shape) behind one
//! capability: fetch a patient's `$everything` bundle.

use crate::domain::{Bundle, CancellationSignal, EverythingFilters, PatientIdentifier, ProviderError};
use async_trait::async_trait;

/// Trait for upstream FHIR provider clients
///
/// One instance per configured provider. Implementations perform a single
/// attempt per call and never retry; retry and timeout policy belongs to the
/// aggregation service.
///
/// # Example
///
/// ```no_run
/// use fhirgate::adapters::fhir::provider::FhirProvider;
/// use fhirgate::domain::{CancellationSignal, EverythingFilters, PatientIdentifier};
///
/// # async fn example(provider: &dyn FhirProvider) -> Result<(), Box<dyn std::error::Error>> {
/// let patient = PatientIdentifier::new("9434765919")?;
/// let bundle = provider
///     .fetch_everything(&patient, &EverythingFilters::default(), &CancellationSignal::never())
///     .await?;
/// println!("{} returned {} entries", provider.name(), bundle.entry.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait FhirProvider: Send + Sync {
    /// Configured provider name
    fn name(&self) -> &str;

    /// FHIR base URL of the provider
    fn base_url(&self) -> &str;

    /// Fetch the `$everything` bundle for a patient
    ///
    /// Must return promptly with [`ProviderError::Cancelled`] once
    /// `cancellation` fires, abandoning the in-flight call.
    ///
    /// # Errors
    ///
    /// Every failure is a [`ProviderError`] naming this provider.
    async fn fetch_everything(
        &self,
        patient: &PatientIdentifier,
        filters: &EverythingFilters,
        cancellation: &CancellationSignal,
    ) -> Result<Bundle, ProviderError>;
}
