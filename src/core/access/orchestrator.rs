//! Consumer access gate
//!
//! Decides whether an authenticated caller may read a patient's record. The
//! gate runs before any provider is contacted.

use super::hashing::hash_identifier;
use crate::adapters::access::{create_access_store, ConsumerAccessStore};
use crate::config::{GatewayConfig, SecretString};
use crate::domain::{
    AccessDecision, CallerIdentity, Component, ErrorKind, GatewayError, PatientIdentifier, Result,
};
use secrecy::ExposeSecret;
use std::sync::Arc;

/// Gate over the consumer access store
pub struct AccessOrchestrator {
    store: Arc<dyn ConsumerAccessStore>,
    pepper: Option<SecretString>,
}

impl AccessOrchestrator {
    /// Looks identifiers up unhashed
    pub fn new(store: Arc<dyn ConsumerAccessStore>) -> Self {
        Self {
            store,
            pepper: None,
        }
    }

    /// Looks identifiers up by their salted hash
    pub fn with_hashing(mut self, pepper: SecretString) -> Self {
        self.pepper = Some(pepper);
        self
    }

    /// Builds the store and hashing mode from configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let store = create_access_store(&config.access)?;
        let orchestrator = Self::new(store);

        if !config.gateway.use_hashed_nhs_number {
            return Ok(orchestrator);
        }

        let pepper = config.gateway.pepper.clone().ok_or_else(|| {
            GatewayError::configuration(
                "gateway.pepper is required when use_hashed_nhs_number is true",
            )
        })?;
        Ok(orchestrator.with_hashing(pepper))
    }

    pub fn is_hashing(&self) -> bool {
        self.pepper.is_some()
    }

    /// The value the access store is queried with
    pub fn lookup_identifier(&self, patient: &PatientIdentifier) -> String {
        match &self.pepper {
            Some(pepper) => hash_identifier(patient.as_str(), pepper.expose_secret().as_ref()),
            None => patient.as_str().to_string(),
        }
    }

    /// Checks that `caller` holds an active grant for `patient`
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if there is no caller identity
    /// - `Forbidden` if the caller holds no active grant
    /// - `Dependency` if the access store cannot be queried
    ///
    /// Errors are logged here and carried outward already marked as logged.
    pub async fn validate_access(
        &self,
        patient: &PatientIdentifier,
        caller: Option<&CallerIdentity>,
    ) -> Result<AccessDecision> {
        let Some(caller) = caller else {
            return Err(GatewayError::unauthorized(
                Component::Access,
                "no authenticated caller identity",
            )
            .logged());
        };

        let identifier = self.lookup_identifier(patient);

        let allowed = self
            .store
            .has_active_access(&identifier, caller)
            .await
            .map_err(|e| {
                let err = if e.kind() == ErrorKind::Dependency {
                    e
                } else {
                    GatewayError::dependency(Component::Access, "consumer access lookup failed")
                        .with_source(e)
                };
                err.logged()
            })?;

        if !allowed {
            return Err(GatewayError::forbidden(
                Component::Access,
                format!(
                    "consumer '{}' has no active access to the requested patient",
                    caller.consumer_id
                ),
            )
            .logged());
        }

        tracing::debug!(
            consumer_id = %caller.consumer_id,
            backend = self.store.backend(),
            hashed = self.is_hashing(),
            "Consumer access granted"
        );

        Ok(AccessDecision::allow(format!(
            "active grant for consumer '{}'",
            caller.consumer_id
        )))
    }
}

impl std::fmt::Debug for AccessOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessOrchestrator")
            .field("backend", &self.store.backend())
            .field("hashing", &self.is_hashing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::access::{AccessGrant, InMemoryConsumerAccessStore};
    use crate::config::secret_string;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl ConsumerAccessStore for BrokenStore {
        async fn has_active_access(&self, _: &str, _: &CallerIdentity) -> Result<bool> {
            Err(GatewayError::service(Component::Access, "socket closed"))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    fn patient() -> PatientIdentifier {
        PatientIdentifier::new("9434765919").unwrap()
    }

    fn caller() -> CallerIdentity {
        CallerIdentity::new("consumer-1").with_organisation("RAL")
    }

    fn orchestrator(patients: &[&str]) -> AccessOrchestrator {
        AccessOrchestrator::new(Arc::new(InMemoryConsumerAccessStore::new(vec![
            AccessGrant::new("consumer-1", "RAL", patients.iter().copied()),
        ])))
    }

    #[tokio::test]
    async fn test_missing_caller_is_unauthorized() {
        let err = orchestrator(&["9434765919"])
            .validate_access(&patient(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(err.is_logged());
    }

    #[tokio::test]
    async fn test_granted() {
        let decision = orchestrator(&["9434765919"])
            .validate_access(&patient(), Some(&caller()))
            .await
            .unwrap();
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_no_grant_is_forbidden() {
        let err = orchestrator(&["1111111111"])
            .validate_access(&patient(), Some(&caller()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_hashed_lookup() {
        let hashed = hash_identifier("9434765919", "pepper");
        let gate = orchestrator(&[hashed.as_str()]).with_hashing(secret_string("pepper".into()));

        assert!(gate.is_hashing());
        assert_eq!(gate.lookup_identifier(&patient()), hashed);
        assert!(gate
            .validate_access(&patient(), Some(&caller()))
            .await
            .is_ok());

        // A grant against the plain identifier no longer matches
        let plain = orchestrator(&["9434765919"]).with_hashing(secret_string("pepper".into()));
        assert!(plain
            .validate_access(&patient(), Some(&caller()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_store_failure_is_dependency_error() {
        let gate = AccessOrchestrator::new(Arc::new(BrokenStore));
        let err = gate
            .validate_access(&patient(), Some(&caller()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dependency);
        assert_eq!(err.component(), Component::Access);
    }
}
