//! Provider descriptor domain model

use super::ids::ProviderName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// FHIR release dialect spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FhirVersion {
    /// FHIR R4 (4.0.1)
    #[default]
    R4,
    /// FHIR STU3 (3.0.2)
    #[serde(rename = "STU3")]
    Stu3,
}

impl std::fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FhirVersion::R4 => f.write_str("R4"),
            FhirVersion::Stu3 => f.write_str("STU3"),
        }
    }
}

/// A configured upstream FHIR data provider
///
/// Descriptors are immutable once loaded into the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Unique provider name
    pub name: ProviderName,

    /// FHIR dialect
    pub fhir_version: FhirVersion,

    /// Whether the provider is switched on
    pub is_active: bool,

    /// Whether the provider wins reconciliation conflicts
    pub is_primary: bool,

    /// Providers used only for side-by-side comparison are not queried by default
    pub is_for_comparison_only: bool,

    /// Start of the validity window (inclusive)
    pub active_from: Option<DateTime<Utc>>,

    /// End of the validity window (exclusive)
    pub active_to: Option<DateTime<Utc>>,

    /// Upper bound on how long aggregation waits for this provider
    pub max_wait_time_milliseconds: u64,
}

impl ProviderDescriptor {
    /// Creates an active, non-primary R4 provider with the given wait budget
    pub fn new(name: ProviderName, max_wait_time_milliseconds: u64) -> Self {
        Self {
            name,
            fhir_version: FhirVersion::R4,
            is_active: true,
            is_primary: false,
            is_for_comparison_only: false,
            active_from: None,
            active_to: None,
            max_wait_time_milliseconds,
        }
    }

    /// Marks the provider as primary
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Marks the provider as inactive
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Marks the provider as comparison-only
    pub fn comparison_only(mut self) -> Self {
        self.is_for_comparison_only = true;
        self
    }

    /// Sets the validity window
    pub fn with_window(
        mut self,
        active_from: Option<DateTime<Utc>>,
        active_to: Option<DateTime<Utc>>,
    ) -> Self {
        self.active_from = active_from;
        self.active_to = active_to;
        self
    }

    /// Sets the FHIR dialect
    pub fn with_fhir_version(mut self, fhir_version: FhirVersion) -> Self {
        self.fhir_version = fhir_version;
        self
    }

    /// Whether the provider is active and inside its validity window at `now`
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if matches!(self.active_from, Some(from) if now < from) {
            return false;
        }
        if matches!(self.active_to, Some(to) if now >= to) {
            return false;
        }
        true
    }

    /// The wait budget as a [`Duration`]
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_time_milliseconds)
    }
}
