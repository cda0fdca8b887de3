//! Per-provider aggregation outcomes

use super::bundle::Bundle;
use super::errors::ProviderError;
use super::ids::ProviderName;
use std::time::Duration;

/// How a single provider's unit of work settled
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeResult {
    /// The provider returned a bundle in time
    Success(Bundle),

    /// The provider's wait budget elapsed first
    Timeout { budget: Duration },

    /// The caller cancelled before the provider answered
    Cancelled,

    /// The provider call failed
    Failure(ProviderError),
}

/// Outcome of one provider, tagged by name
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOutcome {
    pub provider_name: ProviderName,
    pub result: OutcomeResult,
    /// Wall-clock time the unit took to settle
    pub elapsed: Duration,
}

impl ProviderOutcome {
    pub fn new(provider_name: ProviderName, result: OutcomeResult, elapsed: Duration) -> Self {
        Self {
            provider_name,
            result,
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, OutcomeResult::Success(_))
    }

    /// The returned bundle, for successful outcomes
    pub fn bundle(&self) -> Option<&Bundle> {
        match &self.result {
            OutcomeResult::Success(bundle) => Some(bundle),
            _ => None,
        }
    }

    /// Short status label used in logs and summaries
    pub fn status(&self) -> &'static str {
        match self.result {
            OutcomeResult::Success(_) => "success",
            OutcomeResult::Timeout { .. } => "timeout",
            OutcomeResult::Cancelled => "cancelled",
            OutcomeResult::Failure(_) => "failure",
        }
    }

    /// Why the provider produced no bundle
    pub fn failure_reason(&self) -> Option<String> {
        match &self.result {
            OutcomeResult::Success(_) => None,
            OutcomeResult::Timeout { budget } => {
                Some(format!("timed out after {}ms", budget.as_millis()))
            }
            OutcomeResult::Cancelled => Some("cancelled".to_string()),
            OutcomeResult::Failure(error) => Some(error.to_string()),
        }
    }
}
