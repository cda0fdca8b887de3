//! Concurrent `$everything` fan-out
//!
//! Each provider runs as its own spawned task racing three things: the
//! provider call, the provider's wait budget and the caller's cancellation.
//! A slow or faulting provider only ever affects its own outcome.

use crate::adapters::fhir::{FhirProvider, ProviderClients};
use crate::core::registry::ProviderRegistry;
use crate::domain::{
    AggregationRequest, CancellationSignal, Component, EverythingFilters, GatewayError,
    OutcomeResult, PatientIdentifier, ProviderDescriptor, ProviderError, ProviderFailures,
    ProviderOutcome, Result,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Aggregates per-provider bundles for one patient
#[derive(Debug, Clone)]
pub struct AggregationService {
    registry: Arc<ProviderRegistry>,
    clients: ProviderClients,
}

impl AggregationService {
    pub fn new(registry: Arc<ProviderRegistry>, clients: ProviderClients) -> Self {
        Self { registry, clients }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Queries every requested provider and returns one outcome per provider
    ///
    /// Outcomes are in `request.provider_names` order regardless of
    /// completion order.
    ///
    /// # Errors
    ///
    /// - `Validation` if the provider list is empty, repeats a name, or names
    ///   a provider that is unknown or inactive. No provider is called.
    /// - `Cancelled` if no provider succeeded and the caller cancelled.
    /// - `Dependency` if every provider failed or timed out; the source
    ///   carries each provider's reason.
    pub async fn aggregate(&self, request: &AggregationRequest) -> Result<Vec<ProviderOutcome>> {
        let descriptors = self
            .registry
            .resolve_all(&request.provider_names)
            .map_err(GatewayError::logged)?;

        let mut units = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let client = self.clients.get(&descriptor.name).ok_or_else(|| {
                GatewayError::service(
                    Component::Aggregation,
                    format!("no client configured for provider '{}'", descriptor.name),
                )
                .logged()
            })?;
            units.push((descriptor, client));
        }

        tracing::debug!(providers = units.len(), "Fanning out $everything request");

        let (names, handles): (Vec<_>, Vec<_>) = units
            .into_iter()
            .map(|(descriptor, client)| {
                let name = descriptor.name.clone();
                let handle = tokio::spawn(run_unit(
                    descriptor,
                    client,
                    request.patient_identifier.clone(),
                    request.filters.clone(),
                    request.cancellation.clone(),
                ));
                (name, handle)
            })
            .unzip();

        let joined = join_all(handles).await;

        let outcomes: Vec<ProviderOutcome> = names
            .into_iter()
            .zip(joined)
            .map(|(name, joined)| match joined {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    let provider = name.to_string();
                    ProviderOutcome::new(
                        name,
                        OutcomeResult::Failure(ProviderError::Internal {
                            provider,
                            message: join_error.to_string(),
                        }),
                        Duration::ZERO,
                    )
                }
            })
            .collect();

        crate::log_provider_outcomes!(&outcomes);

        if outcomes.iter().any(ProviderOutcome::is_success) {
            return Ok(outcomes);
        }

        if request.cancellation.is_cancelled() {
            return Err(GatewayError::cancelled(Component::Aggregation).logged());
        }

        let failures: Vec<(String, String)> = outcomes
            .iter()
            .map(|o| {
                (
                    o.provider_name.to_string(),
                    o.failure_reason().unwrap_or_default(),
                )
            })
            .collect();

        Err(GatewayError::dependency(
            Component::Aggregation,
            format!("all {} providers failed", failures.len()),
        )
        .with_source(ProviderFailures { failures })
        .logged())
    }
}

/// One provider's unit of work
async fn run_unit(
    descriptor: ProviderDescriptor,
    client: Arc<dyn FhirProvider>,
    patient: PatientIdentifier,
    filters: EverythingFilters,
    cancellation: CancellationSignal,
) -> ProviderOutcome {
    let started = Instant::now();
    let budget = descriptor.max_wait();

    let result = tokio::select! {
        biased;
        _ = cancellation.cancelled() => OutcomeResult::Cancelled,
        fetched = tokio::time::timeout(
            budget,
            client.fetch_everything(&patient, &filters, &cancellation),
        ) => match fetched {
            Ok(Ok(bundle)) => OutcomeResult::Success(bundle),
            Ok(Err(ProviderError::Cancelled { .. })) => OutcomeResult::Cancelled,
            Ok(Err(error)) => OutcomeResult::Failure(error),
            Err(_) => OutcomeResult::Timeout { budget },
        },
    };

    ProviderOutcome::new(descriptor.name, result, started.elapsed())
}
