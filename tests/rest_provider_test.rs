//! Integration tests for the REST provider client and the configured
//! gateway, against mock FHIR servers

use fhirgate::adapters::fhir::{FhirProvider, RestFhirProvider};
use fhirgate::config::{load_config_from_str, ProviderConfig};
use fhirgate::core::access::hash_identifier;
use fhirgate::core::coordination::{Coordinator, EverythingRequest};
use fhirgate::domain::access::{CONSUMER_ID_CLAIM, ORGANISATION_CLAIM};
use fhirgate::domain::{
    CancellationSignal, ErrorKind, EverythingFilters, PatientIdentifier, ProviderError,
};
use chrono::DateTime;
use mockito::Matcher;
use serde_json::{json, Value};
use std::time::Duration;

const PATIENT: &str = "9434765919";

fn provider_config(name: &str, base_url: &str, version: &str) -> ProviderConfig {
    toml::from_str(&format!(
        "name = \"{name}\"\nbase_url = \"{base_url}\"\nfhir_version = \"{version}\"\nauth_type = \"bearer\"\ntoken = \"secret-token\""
    ))
    .unwrap()
}

fn patient() -> PatientIdentifier {
    PatientIdentifier::new(PATIENT).unwrap()
}

fn searchset(resources: Vec<Value>) -> String {
    let entries: Vec<Value> = resources.into_iter().map(|r| json!({ "resource": r })).collect();
    json!({ "resourceType": "Bundle", "type": "searchset", "entry": entries }).to_string()
}

#[tokio::test]
async fn test_r4_request_shape_and_parsing() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/fhir/Patient/9434765919/$everything")
        .match_header("accept", "application/fhir+json")
        .match_header("authorization", "Bearer secret-token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("_count".into(), "10".into()),
            Matcher::UrlEncoded("_since".into(), "2024-01-01T00:00:00Z".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/fhir+json")
        .with_body(searchset(vec![json!({ "resourceType": "Patient", "id": "1" })]))
        .create_async()
        .await;

    let provider =
        RestFhirProvider::new(&provider_config("DDS", &format!("{}/fhir", server.url()), "R4"))
            .unwrap();
    let filters = EverythingFilters {
        count: Some(10),
        since: Some(DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap()),
        ..Default::default()
    };

    let bundle = provider
        .fetch_everything(&patient(), &filters, &CancellationSignal::never())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(bundle.entry.len(), 1);
}

#[tokio::test]
async fn test_stu3_request_uses_patient_parameter_and_since() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/Patient/$everything")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("patient".into(), PATIENT.into()),
            Matcher::UrlEncoded("_since".into(), "2024-01-01T00:00:00Z".into()),
        ]))
        .with_status(200)
        .with_body(searchset(vec![]))
        .create_async()
        .await;

    let provider = RestFhirProvider::new(&provider_config("LDS", &server.url(), "STU3")).unwrap();
    let filters = EverythingFilters {
        since: Some(DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap()),
        ..Default::default()
    };
    let bundle = provider
        .fetch_everything(&patient(), &filters, &CancellationSignal::never())
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(bundle.entry.is_empty());
}

#[tokio::test]
async fn test_server_error_maps_to_http_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Any)
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let provider = RestFhirProvider::new(&provider_config("DDS", &server.url(), "R4")).unwrap();
    let err = provider
        .fetch_everything(&patient(), &EverythingFilters::default(), &CancellationSignal::never())
        .await
        .unwrap_err();

    match err {
        ProviderError::HttpStatus { status, message, .. } => {
            assert_eq!(status, 500);
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_bundle_body_is_invalid_response() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Any)
        .with_status(200)
        .with_body(json!({ "resourceType": "OperationOutcome", "issue": [] }).to_string())
        .create_async()
        .await;

    let provider = RestFhirProvider::new(&provider_config("DDS", &server.url(), "R4")).unwrap();
    let err = provider
        .fetch_everything(&patient(), &EverythingFilters::default(), &CancellationSignal::never())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_cancelled_signal_short_circuits() {
    let (trigger, signal) = CancellationSignal::channel();
    trigger.send(true).unwrap();

    // Nothing listens on this port; cancellation must win first
    let provider =
        RestFhirProvider::new(&provider_config("DDS", "http://127.0.0.1:9/fhir", "R4")).unwrap();
    let err = tokio::time::timeout(
        Duration::from_secs(2),
        provider.fetch_everything(&patient(), &EverythingFilters::default(), &signal),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(err, ProviderError::Cancelled { .. }));
}

#[tokio::test]
async fn test_configured_gateway_end_to_end() {
    let mut dds = mockito::Server::new_async().await;
    let mut lds = mockito::Server::new_async().await;

    let _dds_mock = dds
        .mock("GET", Matcher::Any)
        .with_status(200)
        .with_body(searchset(vec![json!({
            "resourceType": "Patient", "id": "1", "gender": "female"
        })]))
        .create_async()
        .await;
    let _lds_mock = lds
        .mock("GET", Matcher::Any)
        .with_status(200)
        .with_body(searchset(vec![
            json!({ "resourceType": "Patient", "id": "1", "gender": "unknown" }),
            json!({ "resourceType": "Observation", "id": "9" }),
        ]))
        .create_async()
        .await;

    let hashed = hash_identifier(PATIENT, "pepper");
    let config = load_config_from_str(&format!(
        r#"
[gateway]
default_primary_provider = "DDS"
use_hashed_nhs_number = true
pepper = "pepper"

[[providers]]
name = "DDS"
base_url = "{dds_url}"

[[providers]]
name = "LDS"
base_url = "{lds_url}"
fhir_version = "STU3"

[access]
backend = "memory"

[[access.grants]]
consumer_id = "consumer-1"
organisation_code = "RAL"
patients = ["{hashed}"]
"#,
        dds_url = dds.url(),
        lds_url = lds.url(),
    ))
    .unwrap();

    let coordinator = Coordinator::from_config(&config).unwrap();
    let request = EverythingRequest::new(PATIENT)
        .with_claim(CONSUMER_ID_CLAIM, "consumer-1")
        .with_claim(ORGANISATION_CLAIM, "RAL");

    let response = coordinator.everything(request).await.unwrap();
    let body: Value = serde_json::from_str(&response.body).unwrap();
    let entries = body["entry"].as_array().unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["resource"]["gender"], "female");
    assert_eq!(response.content_type, "application/fhir+json");

    // Unhashed identifiers do not match a hashed grant table
    let denied = Coordinator::from_config(&config)
        .unwrap()
        .everything(
            EverythingRequest::new("1234567890")
                .with_claim(CONSUMER_ID_CLAIM, "consumer-1")
                .with_claim(ORGANISATION_CLAIM, "RAL"),
        )
        .await
        .unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::Forbidden);
}
