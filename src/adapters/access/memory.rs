//! In-memory consumer access store
//!
//! Grants come from `[[access.grants]]` config tables. Used for small
//! deployments and tests.

use super::traits::ConsumerAccessStore;
use crate::config::AccessGrantConfig;
use crate::domain::{CallerIdentity, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// A single consumer access grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub consumer_id: String,
    pub organisation_code: String,
    pub patients: HashSet<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl AccessGrant {
    pub fn new(
        consumer_id: impl Into<String>,
        organisation_code: impl Into<String>,
        patients: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            organisation_code: organisation_code.into(),
            patients: patients.into_iter().map(Into::into).collect(),
            valid_from: None,
            valid_to: None,
        }
    }

    pub fn with_validity(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_to = valid_to;
        self
    }

    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !matches!(self.valid_from, Some(from) if now < from)
            && !matches!(self.valid_to, Some(to) if now >= to)
    }

    fn covers(&self, identifier: &str, caller: &CallerIdentity, now: DateTime<Utc>) -> bool {
        self.consumer_id == caller.consumer_id
            && caller.organisation_code.as_deref() == Some(self.organisation_code.as_str())
            && self.patients.contains(identifier)
            && self.is_valid_at(now)
    }
}

impl From<&AccessGrantConfig> for AccessGrant {
    fn from(config: &AccessGrantConfig) -> Self {
        AccessGrant::new(
            config.consumer_id.clone(),
            config.organisation_code.clone(),
            config.patients.iter().cloned(),
        )
        .with_validity(config.valid_from, config.valid_to)
    }
}

/// Grants held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryConsumerAccessStore {
    grants: Vec<AccessGrant>,
}

impl InMemoryConsumerAccessStore {
    pub fn new(grants: Vec<AccessGrant>) -> Self {
        Self { grants }
    }

    pub fn from_config(grants: &[AccessGrantConfig]) -> Self {
        Self::new(grants.iter().map(AccessGrant::from).collect())
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[async_trait]
impl ConsumerAccessStore for InMemoryConsumerAccessStore {
    async fn has_active_access(&self, identifier: &str, caller: &CallerIdentity) -> Result<bool> {
        let now = Utc::now();
        Ok(self
            .grants
            .iter()
            .any(|grant| grant.covers(identifier, caller, now)))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn caller() -> CallerIdentity {
        CallerIdentity::new("consumer-1").with_organisation("RAL")
    }

    #[tokio::test]
    async fn test_matching_grant() {
        let store =
            InMemoryConsumerAccessStore::new(vec![AccessGrant::new("consumer-1", "RAL", ["123"])]);
        assert!(store.has_active_access("123", &caller()).await.unwrap());
        assert!(!store.has_active_access("456", &caller()).await.unwrap());
    }

    #[tokio::test]
    async fn test_organisation_must_match() {
        let store =
            InMemoryConsumerAccessStore::new(vec![AccessGrant::new("consumer-1", "RAL", ["123"])]);

        let other_org = CallerIdentity::new("consumer-1").with_organisation("RRK");
        assert!(!store.has_active_access("123", &other_org).await.unwrap());

        let no_org = CallerIdentity::new("consumer-1");
        assert!(!store.has_active_access("123", &no_org).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_and_future_grants() {
        let now = Utc::now();
        let store = InMemoryConsumerAccessStore::new(vec![
            AccessGrant::new("consumer-1", "RAL", ["expired"])
                .with_validity(None, Some(now - Duration::days(1))),
            AccessGrant::new("consumer-1", "RAL", ["future"])
                .with_validity(Some(now + Duration::days(1)), None),
        ]);

        assert!(!store.has_active_access("expired", &caller()).await.unwrap());
        assert!(!store.has_active_access("future", &caller()).await.unwrap());
    }
}
