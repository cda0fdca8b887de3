//! Provider registry
//!
//! Read-only lookup over the configured upstream providers. Built once at
//! startup and shared behind an `Arc`; nothing mutates it afterwards.

use crate::config::GatewayConfig;
use crate::domain::{
    Component, GatewayError, ProviderDescriptor, ProviderName, Result, ValidationError, Violation,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Configured upstream providers, in configuration order
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Builds a registry, rejecting inconsistent provider sets
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for duplicate names, more than one
    /// primary provider, inverted validity windows or zero wait budgets.
    pub fn new(providers: Vec<ProviderDescriptor>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut primary: Option<&ProviderName> = None;

        for provider in &providers {
            if !names.insert(provider.name.clone()) {
                return Err(GatewayError::configuration(format!(
                    "duplicate provider name '{}'",
                    provider.name
                )));
            }

            if provider.max_wait_time_milliseconds == 0 {
                return Err(GatewayError::configuration(format!(
                    "provider '{}' has a zero wait budget",
                    provider.name
                )));
            }

            if let (Some(from), Some(to)) = (provider.active_from, provider.active_to) {
                if from >= to {
                    return Err(GatewayError::configuration(format!(
                        "provider '{}' has active_from after active_to",
                        provider.name
                    )));
                }
            }

            if provider.is_primary {
                if let Some(existing) = primary {
                    return Err(GatewayError::configuration(format!(
                        "providers '{}' and '{}' are both marked primary",
                        existing, provider.name
                    )));
                }
                primary = Some(&provider.name);
            }
        }

        Ok(Self { providers })
    }

    /// Builds the registry from the `[[providers]]` tables
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Self::new(config.provider_descriptors())
    }

    /// Resolves an active, window-valid provider by name
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if the name is unknown, inactive or
    /// outside its validity window.
    pub fn resolve(&self, name: &ProviderName) -> Result<ProviderDescriptor> {
        self.resolve_at(name, Utc::now())
    }

    /// Same as [`ProviderRegistry::resolve`] evaluated at `now`
    pub fn resolve_at(&self, name: &ProviderName, now: DateTime<Utc>) -> Result<ProviderDescriptor> {
        self.find_available(name, now).cloned().ok_or_else(|| {
            GatewayError::validation(
                Component::Registry,
                format!("provider '{name}' not found or inactive"),
            )
        })
    }

    /// Resolves an ordered list of names
    ///
    /// Every unresolvable or duplicated name is reported in a single
    /// validation error.
    pub fn resolve_all(&self, names: &[ProviderName]) -> Result<Vec<ProviderDescriptor>> {
        self.resolve_all_at(names, Utc::now())
    }

    pub fn resolve_all_at(
        &self,
        names: &[ProviderName],
        now: DateTime<Utc>,
    ) -> Result<Vec<ProviderDescriptor>> {
        if names.is_empty() {
            return Err(GatewayError::validation(
                Component::Registry,
                "at least one provider must be requested",
            ));
        }

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(names.len());
        let mut violations = Vec::new();

        for name in names {
            if !seen.insert(name) {
                violations.push(Violation::new(
                    "providers",
                    format!("provider '{name}' requested more than once"),
                ));
                continue;
            }

            match self.find_available(name, now) {
                Some(provider) => resolved.push(provider.clone()),
                None => violations.push(Violation::new(
                    "providers",
                    format!("provider '{name}' not found or inactive"),
                )),
            }
        }

        if !violations.is_empty() {
            return Err(GatewayError::invalid(
                Component::Registry,
                ValidationError { violations },
            ));
        }

        Ok(resolved)
    }

    /// Active, window-valid providers in configuration order
    pub fn list_active(&self) -> Vec<ProviderDescriptor> {
        self.list_active_at(Utc::now())
    }

    pub fn list_active_at(&self, now: DateTime<Utc>) -> Vec<ProviderDescriptor> {
        self.providers
            .iter()
            .filter(|p| p.is_available_at(now))
            .cloned()
            .collect()
    }

    /// Providers queried when a request names none: active and not
    /// comparison-only
    pub fn default_selection(&self) -> Vec<ProviderName> {
        let now = Utc::now();
        self.providers
            .iter()
            .filter(|p| p.is_available_at(now) && !p.is_for_comparison_only)
            .map(|p| p.name.clone())
            .collect()
    }

    /// The active primary provider, if any
    pub fn primary(&self) -> Option<ProviderDescriptor> {
        let now = Utc::now();
        self.providers
            .iter()
            .find(|p| p.is_primary && p.is_available_at(now))
            .cloned()
    }

    /// All configured providers regardless of state
    pub fn all(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn find_available(&self, name: &ProviderName, now: DateTime<Utc>) -> Option<&ProviderDescriptor> {
        self.providers
            .iter()
            .find(|p| &p.name == name && p.is_available_at(now))
    }
}
