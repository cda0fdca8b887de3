//! Caller identity and access decisions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Claim carrying the registered consumer id
pub const CONSUMER_ID_CLAIM: &str = "consumer_id";

/// Claim carrying the caller's organisation (ODS) code
pub const ORGANISATION_CLAIM: &str = "organisation_code";

/// Claims presented by the authentication collaborator
pub type CallerClaims = BTreeMap<String, String>;

/// An authenticated API consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Registered consumer id
    pub consumer_id: String,

    /// Organisation the consumer acts for, when the claim is present
    pub organisation_code: Option<String>,
}

impl CallerIdentity {
    pub fn new(consumer_id: impl Into<String>) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            organisation_code: None,
        }
    }

    pub fn with_organisation(mut self, organisation_code: impl Into<String>) -> Self {
        self.organisation_code = Some(organisation_code.into());
        self
    }
}

/// Result of the access gate
///
/// Ephemeral; produced per call and never persisted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: String,
}

impl AccessDecision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}
