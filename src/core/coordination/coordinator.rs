//! `$everything` request coordinator
//!
//! Drives one request through validation, the access gate, aggregation,
//! reconciliation and serialization. Each failure is classified and logged
//! once, moves the request to `Errored`, and is audited.

use super::identity::{ClaimsIdentityResolver, IdentityResolver};
use super::serializer::{BundleSerializer, JsonBundleSerializer};
use super::state::{CoordinationState, StateTracker};
use crate::adapters::fhir::ProviderClients;
use crate::config::GatewayConfig;
use crate::core::access::AccessOrchestrator;
use crate::core::aggregate::AggregationService;
use crate::core::reconcile::{reconcile, BundleStamp, EntryProvenance};
use crate::core::registry::ProviderRegistry;
use crate::core::validation::Validator;
use crate::domain::{
    AggregationRequest, CallerClaims, CallerIdentity, CancellationSignal, Component, ErrorKind,
    EverythingFilters, GatewayError, PatientIdentifier, ProviderName, ProviderOutcome, Result,
};
use crate::logging::audit::{AuditAction, AuditTrail};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Error kinds the coordinator passes through unchanged
const RECOGNISED_KINDS: &[ErrorKind] = &[
    ErrorKind::Validation,
    ErrorKind::Unauthorized,
    ErrorKind::Forbidden,
    ErrorKind::Dependency,
    ErrorKind::Cancelled,
    ErrorKind::Reconciliation,
    ErrorKind::Service,
];

/// Inbound `$everything` call as received at the API boundary
#[derive(Debug, Clone, Default)]
pub struct EverythingRequest {
    pub patient_identifier: String,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub type_filter: Option<String>,
    pub since: Option<DateTime<FixedOffset>>,
    pub count: Option<u32>,
    /// Provider whose records win conflicts; falls back to configuration
    pub primary_provider: Option<String>,
    /// Providers to query; empty means every active, non-comparison provider
    pub providers: Vec<String>,
    /// Claims from the authentication collaborator
    pub claims: CallerClaims,
    pub cancellation: CancellationSignal,
}

impl EverythingRequest {
    pub fn new(patient_identifier: impl Into<String>) -> Self {
        Self {
            patient_identifier: patient_identifier.into(),
            ..Default::default()
        }
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_primary(mut self, primary: impl Into<String>) -> Self {
        self.primary_provider = Some(primary.into());
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationSignal) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Response body plus what produced it
#[derive(Debug, Clone, Serialize)]
pub struct SerializedBundle {
    pub request_id: String,
    pub content_type: &'static str,
    pub body: String,
    /// Entries in the merged bundle
    pub total: usize,
    pub provenance: Vec<EntryProvenance>,
    /// `(provider, status)` per queried provider, in request order
    pub provider_statuses: Vec<(String, String)>,
    pub states: Vec<CoordinationState>,
}

/// Arguments after validation
struct ValidatedRequest {
    patient: PatientIdentifier,
    filters: EverythingFilters,
    providers: Vec<ProviderName>,
    primary: Option<ProviderName>,
}

/// Coordinates `$everything` requests
pub struct Coordinator {
    aggregation: AggregationService,
    access: AccessOrchestrator,
    identity: Arc<dyn IdentityResolver>,
    serializer: Arc<dyn BundleSerializer>,
    audit: AuditTrail,
    default_primary: Option<ProviderName>,
}

impl Coordinator {
    /// Creates a coordinator with claim-based identity, compact JSON output
    /// and no audit sinks
    pub fn new(aggregation: AggregationService, access: AccessOrchestrator) -> Self {
        Self {
            aggregation,
            access,
            identity: Arc::new(ClaimsIdentityResolver),
            serializer: Arc::new(JsonBundleSerializer::default()),
            audit: AuditTrail::default(),
            default_primary: None,
        }
    }

    /// Wires every component from configuration
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the registry, a provider client,
    /// the access store or an audit sink cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let registry = Arc::new(ProviderRegistry::from_config(config)?);
        let clients = ProviderClients::from_config(config)?;
        let access = AccessOrchestrator::from_config(config)?;
        let audit = AuditTrail::from_config(config).map_err(|e| {
            GatewayError::configuration(format!("Failed to create audit sinks: {e:#}"))
        })?;

        let coordinator = Self::new(AggregationService::new(registry, clients), access)
            .with_serializer(Arc::new(JsonBundleSerializer::new(
                config.application.pretty_output,
            )))
            .with_audit(audit);

        Ok(match config.gateway.default_primary_provider.clone() {
            Some(primary) => coordinator.with_default_primary(primary),
            None => coordinator,
        })
    }

    pub fn with_identity_resolver(mut self, identity: Arc<dyn IdentityResolver>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn BundleSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_audit(mut self, audit: AuditTrail) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_default_primary(mut self, primary: ProviderName) -> Self {
        self.default_primary = Some(primary);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        self.aggregation.registry()
    }

    /// Runs one `$everything` request end to end
    ///
    /// # Errors
    ///
    /// A single [`GatewayError`], already logged, whose kind tells the
    /// boundary how to answer: `Validation`, `Unauthorized`, `Forbidden`,
    /// `Dependency`, `Cancelled`, `Reconciliation` or `Service`.
    pub async fn everything(&self, request: EverythingRequest) -> Result<SerializedBundle> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("everything", request_id = %request_id);

        async move {
            let mut tracker = StateTracker::new();
            let mut audit_patient: Option<PatientIdentifier> = None;
            let mut audit_caller: Option<CallerIdentity> = None;

            let result = self
                .run(
                    &request,
                    &request_id,
                    &mut tracker,
                    &mut audit_patient,
                    &mut audit_caller,
                )
                .await;

            match result {
                Ok(serialized) => Ok(serialized),
                Err(err) => {
                    let err = err.classify(Component::Coordination, RECOGNISED_KINDS).logged();
                    tracker.fail();
                    self.audit.record(
                        &self.audit.event(
                            &request_id,
                            AuditAction::Failed,
                            audit_patient.as_ref(),
                            audit_caller.as_ref(),
                        )
                        .with_error(err.kind())
                        .with_detail(format!("failed after {:?}", tracker.trace())),
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: &EverythingRequest,
        request_id: &str,
        tracker: &mut StateTracker,
        audit_patient: &mut Option<PatientIdentifier>,
        audit_caller: &mut Option<CallerIdentity>,
    ) -> Result<SerializedBundle> {
        let validated = self.validate(request)?;
        *audit_patient = Some(validated.patient.clone());
        tracker.advance(CoordinationState::Validated)?;

        let caller = self.identity.resolve(&request.claims);
        *audit_caller = caller.clone();
        self.audit.record(
            &self.audit.event(
                request_id,
                AuditAction::Requested,
                Some(&validated.patient),
                caller.as_ref(),
            ),
        );

        self.access
            .validate_access(&validated.patient, caller.as_ref())
            .await?;
        tracker.advance(CoordinationState::AccessChecked)?;
        self.audit.record(
            &self.audit.event(
                request_id,
                AuditAction::AccessGranted,
                Some(&validated.patient),
                caller.as_ref(),
            ),
        );

        ensure_not_cancelled(&request.cancellation)?;

        let aggregation_request =
            AggregationRequest::new(validated.patient.clone(), validated.providers.clone())
                .with_filters(validated.filters.clone())
                .with_cancellation(request.cancellation.clone());
        let outcomes = self.aggregation.aggregate(&aggregation_request).await?;
        ensure_not_cancelled(&request.cancellation)?;
        tracker.advance(CoordinationState::Aggregated)?;

        let reconciled = reconcile(&outcomes, validated.primary.as_ref(), BundleStamp::now())?;
        tracker.advance(CoordinationState::Reconciled)?;

        tracing::debug!(
            entries = reconciled.provenance.len(),
            conflicts = reconciled.conflict_count(),
            primary = validated.primary.as_ref().map(|p| p.as_str()).unwrap_or(""),
            "Bundles reconciled"
        );

        let body = self.serializer.serialize(&reconciled.bundle)?;
        tracker.advance(CoordinationState::Serialized)?;

        tracker.advance(CoordinationState::Returned)?;
        let total = reconciled.provenance.len();
        self.audit.record(
            &self.audit.event(
                request_id,
                AuditAction::Completed,
                Some(&validated.patient),
                caller.as_ref(),
            )
            .with_detail(format!(
                "entries={total} providers={}/{}",
                outcomes.iter().filter(|o| o.is_success()).count(),
                outcomes.len()
            )),
        );

        Ok(SerializedBundle {
            request_id: request_id.to_string(),
            content_type: self.serializer.content_type(),
            body,
            total,
            provenance: reconciled.provenance,
            provider_statuses: provider_statuses(&outcomes),
            states: tracker.trace().to_vec(),
        })
    }

    /// Applies the argument rules and resolves defaults
    fn validate(&self, request: &EverythingRequest) -> Result<ValidatedRequest> {
        let patient = PatientIdentifier::new(request.patient_identifier.as_str());
        let requested: Vec<std::result::Result<ProviderName, String>> = request
            .providers
            .iter()
            .map(|p| ProviderName::new(p.as_str()))
            .collect();
        let primary = request
            .primary_provider
            .as_deref()
            .map(ProviderName::new)
            .transpose();

        let dates_ordered = match (request.start, request.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        };
        let type_filter_valid = request.type_filter.as_deref().map_or(true, |types| {
            types.split(',').all(|t| is_resource_type(t.trim()))
        });

        let mut validator = Validator::new()
            .check("patient_identifier", patient.as_ref())
            .require(
                "count",
                "must be a positive integer",
                request.count.map_or(true, |c| c > 0),
            )
            .require("start", "must not be after end", dates_ordered)
            .require(
                "_type",
                "must be a comma separated list of resource types",
                type_filter_valid,
            )
            .check("primary_provider", primary.as_ref());
        for name in &requested {
            validator = validator.check("providers", name.as_ref());
        }
        validator.finish(Component::Coordination)?;

        let (Ok(patient), Ok(primary)) = (patient, primary) else {
            return Err(GatewayError::service(
                Component::Coordination,
                "validated arguments failed to convert",
            ));
        };
        let mut providers: Vec<ProviderName> = requested.into_iter().flatten().collect();

        if providers.is_empty() {
            providers = self.registry().default_selection();
            if providers.is_empty() {
                return Err(GatewayError::validation(
                    Component::Coordination,
                    "no active providers are available",
                ));
            }
        }

        let primary = match primary {
            Some(explicit) => {
                if !providers.contains(&explicit) {
                    return Err(GatewayError::validation(
                        Component::Coordination,
                        format!("primary_provider '{explicit}' is not one of the requested providers"),
                    ));
                }
                Some(explicit)
            }
            None => self
                .default_primary
                .clone()
                .or_else(|| self.registry().primary().map(|p| p.name)),
        };

        Ok(ValidatedRequest {
            patient,
            filters: EverythingFilters {
                start: request.start,
                end: request.end,
                type_filter: request.type_filter.as_ref().map(|t| t.trim().to_string()),
                since: request.since,
                count: request.count,
            },
            providers,
            primary,
        })
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("aggregation", &self.aggregation)
            .field("access", &self.access)
            .field("audit", &self.audit)
            .field("default_primary", &self.default_primary)
            .finish()
    }
}

/// FHIR resource type names are ASCII letters starting upper-case
fn is_resource_type(name: &str) -> bool {
    name.len() > 1
        && name.starts_with(|c: char| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_alphabetic())
}

fn ensure_not_cancelled(cancellation: &CancellationSignal) -> Result<()> {
    if cancellation.is_cancelled() {
        return Err(GatewayError::cancelled(Component::Coordination));
    }
    Ok(())
}

fn provider_statuses(outcomes: &[ProviderOutcome]) -> Vec<(String, String)> {
    outcomes
        .iter()
        .map(|o| (o.provider_name.to_string(), o.status().to_string()))
        .collect()
}
