//! FHIR provider client factory
//!
//! This module builds one provider client per configured `[[providers]]`
//! table and keeps them keyed by provider name.

use super::provider::{FhirProvider, RestFhirProvider};
use crate::config::GatewayConfig;
use crate::domain::{ProviderName, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Provider clients keyed by name
#[derive(Clone, Default)]
pub struct ProviderClients {
    clients: HashMap<ProviderName, Arc<dyn FhirProvider>>,
}

impl ProviderClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a REST client for every configured provider
    ///
    /// Inactive providers get a client too; the registry decides whether
    /// they are ever called.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if any client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let mut clients = Self::new();

        for provider in &config.providers {
            tracing::info!(
                provider = %provider.name,
                base_url = %provider.base_url,
                fhir_version = %provider.fhir_version,
                "Creating FHIR provider client"
            );
            let client = RestFhirProvider::new(provider)?;
            clients.insert(provider.name.clone(), Arc::new(client));
        }

        Ok(clients)
    }

    /// Registers (or replaces) the client for `name`
    pub fn insert(&mut self, name: ProviderName, client: Arc<dyn FhirProvider>) {
        self.clients.insert(name, client);
    }

    /// Builder-style [`ProviderClients::insert`]
    pub fn with(mut self, name: ProviderName, client: Arc<dyn FhirProvider>) -> Self {
        self.insert(name, client);
        self
    }

    pub fn get(&self, name: &ProviderName) -> Option<Arc<dyn FhirProvider>> {
        self.clients.get(name).cloned()
    }

    pub fn contains(&self, name: &ProviderName) -> bool {
        self.clients.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl std::fmt::Debug for ProviderClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.clients.keys().map(ProviderName::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ProviderClients")
            .field("providers", &names)
            .finish()
    }
}
