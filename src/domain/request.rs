//! `$everything` filters and aggregation requests

use super::cancellation::CancellationSignal;
use super::ids::{PatientIdentifier, ProviderName};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Optional `$everything` operation parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EverythingFilters {
    /// `start`: care date range lower bound
    pub start: Option<DateTime<FixedOffset>>,

    /// `end`: care date range upper bound
    pub end: Option<DateTime<FixedOffset>>,

    /// `_type`: comma separated resource types
    pub type_filter: Option<String>,

    /// `_since`: only resources updated after this instant
    pub since: Option<DateTime<FixedOffset>>,

    /// `_count`: page size hint
    pub count: Option<u32>,
}

impl EverythingFilters {
    /// Whether no filter is set
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && self.type_filter.is_none()
            && self.since.is_none()
            && self.count.is_none()
    }

    /// Query parameters for the given FHIR dialect
    ///
    /// Query parameters shared by both dialects
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(start) = self.start {
            pairs.push(("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(end) = self.end {
            pairs.push(("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(type_filter) = &self.type_filter {
            pairs.push(("_type", type_filter.clone()));
        }
        if let Some(since) = self.since {
            pairs.push(("_since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(count) = self.count {
            pairs.push(("_count", count.to_string()));
        }

        pairs
    }
}

/// One patient query fanned out to a set of providers
///
/// Constructed by the coordination layer and passed down by reference; no
/// downstream component mutates it.
#[derive(Debug, Clone)]
pub struct AggregationRequest {
    pub patient_identifier: PatientIdentifier,
    pub filters: EverythingFilters,
    /// Ordered, duplicate-free provider names
    pub provider_names: Vec<ProviderName>,
    pub cancellation: CancellationSignal,
}

impl AggregationRequest {
    pub fn new(patient_identifier: PatientIdentifier, provider_names: Vec<ProviderName>) -> Self {
        Self {
            patient_identifier,
            filters: EverythingFilters::default(),
            provider_names,
            cancellation: CancellationSignal::never(),
        }
    }

    pub fn with_filters(mut self, filters: EverythingFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationSignal) -> Self {
        self.cancellation = cancellation;
        self
    }
}
