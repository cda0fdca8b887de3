//! Integration tests for aggregation, reconciliation and the access gate
//!
//! Providers are in-process doubles with configurable latency and failure,
//! so every test runs without network access.

use async_trait::async_trait;
use fhirgate::adapters::access::{AccessGrant, InMemoryConsumerAccessStore};
use fhirgate::adapters::fhir::{FhirProvider, ProviderClients};
use fhirgate::core::access::AccessOrchestrator;
use fhirgate::core::aggregate::AggregationService;
use fhirgate::core::coordination::{CoordinationState, Coordinator, EverythingRequest};
use fhirgate::core::reconcile::{reconcile, BundleStamp};
use fhirgate::core::registry::ProviderRegistry;
use fhirgate::domain::access::{CONSUMER_ID_CLAIM, ORGANISATION_CLAIM};
use fhirgate::domain::{
    AggregationRequest, Bundle, CancellationSignal, ErrorKind, EverythingFilters, OutcomeResult,
    PatientIdentifier, ProviderDescriptor, ProviderError, ProviderName,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const PATIENT: &str = "9434765919";

enum Behaviour {
    Respond(Bundle),
    Fail,
}

struct MockProvider {
    name: String,
    delay: Duration,
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    fn new(name: &str, delay_ms: u64, behaviour: Behaviour) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::from_millis(delay_ms),
            behaviour,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl FhirProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &str {
        "mock://provider"
    }

    async fn fetch_everything(
        &self,
        _patient: &PatientIdentifier,
        _filters: &EverythingFilters,
        cancellation: &CancellationSignal,
    ) -> Result<Bundle, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::select! {
            _ = cancellation.cancelled() => {
                return Err(ProviderError::Cancelled { provider: self.name.clone() });
            }
            _ = tokio::time::sleep(self.delay) => {}
        }

        match &self.behaviour {
            Behaviour::Respond(bundle) => Ok(bundle.clone()),
            Behaviour::Fail => Err(ProviderError::HttpStatus {
                provider: self.name.clone(),
                status: 503,
                message: "unavailable".to_string(),
            }),
        }
    }
}

fn name(s: &str) -> ProviderName {
    ProviderName::new(s).unwrap()
}

fn bundle(resources: Vec<Value>) -> Bundle {
    let entries: Vec<Value> = resources.into_iter().map(|r| json!({ "resource": r })).collect();
    serde_json::from_value(json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "entry": entries,
    }))
    .unwrap()
}

fn patient_resource(last_updated: &str, family: &str) -> Value {
    json!({
        "resourceType": "Patient",
        "id": "1",
        "meta": { "lastUpdated": last_updated },
        "name": [{ "family": family }],
    })
}

/// Builds a service over `(provider, budget_ms)` pairs, returning the call
/// counters in the same order
fn service(
    providers: Vec<(MockProvider, u64)>,
    primary: Option<&str>,
) -> (AggregationService, Vec<Arc<AtomicUsize>>) {
    let mut descriptors = Vec::new();
    let mut clients = ProviderClients::new();
    let mut counters = Vec::new();

    for (provider, budget) in providers {
        let mut descriptor = ProviderDescriptor::new(name(&provider.name), budget);
        if primary == Some(provider.name.as_str()) {
            descriptor = descriptor.primary();
        }
        descriptors.push(descriptor);
        counters.push(provider.calls.clone());
        clients.insert(name(&provider.name), Arc::new(provider));
    }

    let registry = Arc::new(ProviderRegistry::new(descriptors).unwrap());
    (AggregationService::new(registry, clients), counters)
}

fn request(names: &[&str]) -> AggregationRequest {
    AggregationRequest::new(
        PatientIdentifier::new(PATIENT).unwrap(),
        names.iter().map(|n| name(n)).collect(),
    )
}

fn access(grants: Vec<AccessGrant>) -> AccessOrchestrator {
    AccessOrchestrator::new(Arc::new(InMemoryConsumerAccessStore::new(grants)))
}

fn authorised(request: EverythingRequest) -> EverythingRequest {
    request
        .with_claim(CONSUMER_ID_CLAIM, "consumer-1")
        .with_claim(ORGANISATION_CLAIM, "RAL")
}

fn grant() -> AccessGrant {
    AccessGrant::new("consumer-1", "RAL", [PATIENT])
}

#[tokio::test]
async fn test_one_outcome_per_requested_provider() {
    let (service, _) = service(
        vec![
            (MockProvider::new("A", 0, Behaviour::Respond(bundle(vec![]))), 1000),
            (MockProvider::new("B", 0, Behaviour::Fail), 1000),
            (MockProvider::new("C", 500, Behaviour::Respond(bundle(vec![]))), 20),
        ],
        None,
    );

    let outcomes = service.aggregate(&request(&["A", "B", "C"])).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_success());
    assert!(matches!(outcomes[1].result, OutcomeResult::Failure(_)));
    assert!(matches!(outcomes[2].result, OutcomeResult::Timeout { .. }));
}

#[tokio::test]
async fn test_outcomes_follow_request_order_not_completion_order() {
    let (service, _) = service(
        vec![
            (MockProvider::new("SLOW", 150, Behaviour::Respond(bundle(vec![]))), 1000),
            (MockProvider::new("MID", 75, Behaviour::Respond(bundle(vec![]))), 1000),
            (MockProvider::new("FAST", 0, Behaviour::Respond(bundle(vec![]))), 1000),
        ],
        None,
    );

    let outcomes = service
        .aggregate(&request(&["SLOW", "MID", "FAST"]))
        .await
        .unwrap();
    let names: Vec<&str> = outcomes.iter().map(|o| o.provider_name.as_str()).collect();
    assert_eq!(names, vec!["SLOW", "MID", "FAST"]);
}

#[tokio::test]
async fn test_failing_provider_does_not_block_others() {
    let (service, _) = service(
        vec![
            (MockProvider::new("BROKEN", 0, Behaviour::Fail), 1000),
            (MockProvider::new("HUNG", 10_000, Behaviour::Fail), 30),
            (
                MockProvider::new("OK", 10, Behaviour::Respond(bundle(vec![patient_resource("2024-01-01T00:00:00Z", "Smith")]))),
                1000,
            ),
        ],
        None,
    );

    let outcomes = service
        .aggregate(&request(&["BROKEN", "HUNG", "OK"]))
        .await
        .unwrap();
    assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
    assert_eq!(outcomes[2].bundle().unwrap().entry.len(), 1);
}

#[tokio::test]
async fn test_total_failure_escalates() {
    let (service, _) = service(
        vec![
            (MockProvider::new("A", 0, Behaviour::Fail), 1000),
            (MockProvider::new("B", 1000, Behaviour::Fail), 20),
        ],
        None,
    );

    let err = service.aggregate(&request(&["A", "B"])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Dependency);
    assert!(err.is_logged());
    assert_eq!(err.provider_failures().len(), 2);
}

#[tokio::test]
async fn test_partial_failure_does_not_escalate() {
    let (service, _) = service(
        vec![
            (MockProvider::new("A", 0, Behaviour::Fail), 1000),
            (MockProvider::new("B", 0, Behaviour::Respond(bundle(vec![]))), 1000),
        ],
        None,
    );

    assert!(service.aggregate(&request(&["A", "B"])).await.is_ok());
}

#[tokio::test]
async fn test_timeout_is_honoured() {
    let (service, _) = service(
        vec![
            (MockProvider::new("SLOW", 500, Behaviour::Respond(bundle(vec![]))), 50),
            (MockProvider::new("FAST", 0, Behaviour::Respond(bundle(vec![]))), 1000),
        ],
        None,
    );

    let started = Instant::now();
    let outcomes = service.aggregate(&request(&["SLOW", "FAST"])).await.unwrap();
    let elapsed = started.elapsed();

    assert!(matches!(
        outcomes[0].result,
        OutcomeResult::Timeout { budget } if budget == Duration::from_millis(50)
    ));
    assert!(elapsed < Duration::from_millis(400), "took {elapsed:?}");
}

#[test]
fn test_primary_wins_and_merge_is_pure() {
    let dds = bundle(vec![patient_resource("2024-01-01T00:00:00Z", "Primary")]);
    let lds = bundle(vec![
        patient_resource("2024-06-01T00:00:00Z", "Secondary"),
        json!({ "resourceType": "Observation", "id": "9" }),
    ]);
    let outcomes = vec![
        fhirgate::domain::ProviderOutcome::new(name("LDS"), OutcomeResult::Success(lds), Duration::ZERO),
        fhirgate::domain::ProviderOutcome::new(name("DDS"), OutcomeResult::Success(dds), Duration::ZERO),
    ];
    let stamp = || BundleStamp::new("merged", Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());

    let first = reconcile(&outcomes, Some(&name("DDS")), stamp()).unwrap();
    let second = reconcile(&outcomes, Some(&name("DDS")), stamp()).unwrap();

    let patient = first.bundle.entry[0].resource.as_ref().unwrap();
    assert_eq!(patient["name"][0]["family"], "Primary");
    assert_eq!(
        serde_json::to_string(&first.bundle).unwrap(),
        serde_json::to_string(&second.bundle).unwrap()
    );
}

#[tokio::test]
async fn test_denied_access_invokes_no_provider() {
    let (aggregation, counters) = service(
        vec![
            (MockProvider::new("DDS", 0, Behaviour::Respond(bundle(vec![]))), 1000),
            (MockProvider::new("LDS", 0, Behaviour::Respond(bundle(vec![]))), 1000),
        ],
        None,
    );
    let coordinator = Coordinator::new(
        aggregation,
        access(vec![AccessGrant::new("someone-else", "RAL", [PATIENT])]),
    );

    let err = coordinator
        .everything(authorised(EverythingRequest::new(PATIENT)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Forbidden);
    for counter in counters {
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_dds_lds_scenario() {
    let dds = MockProvider::new(
        "DDS",
        20,
        Behaviour::Respond(bundle(vec![patient_resource("2024-01-01T00:00:00Z", "Dds")])),
    );
    let lds = MockProvider::new(
        "LDS",
        0,
        Behaviour::Respond(bundle(vec![
            patient_resource("2024-05-05T00:00:00Z", "Lds"),
            json!({ "resourceType": "Observation", "id": "9" }),
        ])),
    );
    let (aggregation, _) = service(vec![(dds, 5000), (lds, 5000)], Some("DDS"));
    let coordinator = Coordinator::new(aggregation, access(vec![grant()]));

    let response = coordinator
        .everything(authorised(
            EverythingRequest::new(PATIENT).with_providers(["DDS", "LDS"]),
        ))
        .await
        .unwrap();

    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["resourceType"], "Bundle");
    assert_eq!(body["type"], "searchset");

    let entries = body["entry"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["resource"]["resourceType"], "Patient");
    assert_eq!(entries[0]["resource"]["name"][0]["family"], "Dds");
    assert_eq!(entries[1]["resource"]["resourceType"], "Observation");
    assert_eq!(entries[1]["resource"]["id"], "9");

    assert_eq!(response.total, 2);
    assert_eq!(
        response.states,
        vec![
            CoordinationState::Received,
            CoordinationState::Validated,
            CoordinationState::AccessChecked,
            CoordinationState::Aggregated,
            CoordinationState::Reconciled,
            CoordinationState::Serialized,
            CoordinationState::Returned,
        ]
    );
}

#[tokio::test]
async fn test_cancellation_during_aggregation() {
    let (aggregation, _) = service(
        vec![(MockProvider::new("DDS", 5_000, Behaviour::Respond(bundle(vec![]))), 10_000)],
        None,
    );
    let coordinator = Coordinator::new(aggregation, access(vec![grant()]));
    let (trigger, signal) = CancellationSignal::channel();

    let handle = tokio::spawn(async move {
        coordinator
            .everything(authorised(EverythingRequest::new(PATIENT)).with_cancellation(signal))
            .await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.send(true).unwrap();

    let started = Instant::now();
    let err = handle.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(1));
}
