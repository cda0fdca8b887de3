//! REST implementation of the FHIR provider client
//!
//! Issues `GET .../$everything` against an R4 or STU3 server. R4 providers
//! use the instance-level operation (`Patient/{id}/$everything`); STU3
//! providers use the type-level form with a `patient` parameter. Both
//! receive the same filter parameters.

use super::FhirProvider;
use crate::config::{ProviderConfig, SecretString};
use crate::domain::{
    Bundle, CancellationSignal, EverythingFilters, FhirVersion, GatewayError, PatientIdentifier,
    ProviderError, Result,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;
use url::Url;

const FHIR_JSON: &str = "application/fhir+json";

/// Outbound authentication for a provider
#[derive(Clone)]
pub enum ProviderAuth {
    None,
    Basic {
        username: String,
        password: SecretString,
    },
    Bearer {
        token: SecretString,
    },
}

impl ProviderAuth {
    /// Builds the auth settings from a provider's config table
    ///
    /// The table has already been validated, so a missing credential falls
    /// back to anonymous access with a warning.
    pub fn from_config(config: &ProviderConfig) -> Self {
        match config.auth_type.as_str() {
            "basic" => match (&config.username, &config.password) {
                (Some(username), Some(password)) => ProviderAuth::Basic {
                    username: username.clone(),
                    password: password.clone(),
                },
                _ => {
                    tracing::warn!(provider = %config.name, "Basic auth configured without credentials");
                    ProviderAuth::None
                }
            },
            "bearer" => match &config.token {
                Some(token) => ProviderAuth::Bearer {
                    token: token.clone(),
                },
                None => {
                    tracing::warn!(provider = %config.name, "Bearer auth configured without a token");
                    ProviderAuth::None
                }
            },
            _ => ProviderAuth::None,
        }
    }

    fn header_value(&self) -> Option<String> {
        match self {
            ProviderAuth::None => None,
            ProviderAuth::Basic { username, password } => {
                let credentials = format!("{username}:{}", password.expose_secret().as_ref());
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                Some(format!("Basic {encoded}"))
            }
            ProviderAuth::Bearer { token } => Some(format!("Bearer {}", token.expose_secret().as_ref())),
        }
    }
}

impl std::fmt::Debug for ProviderAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderAuth::None => f.write_str("None"),
            ProviderAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            ProviderAuth::Bearer { .. } => f.write_str("Bearer"),
        }
    }
}

/// HTTP client for one upstream FHIR server
#[derive(Debug)]
pub struct RestFhirProvider {
    name: String,
    base_url: Url,
    fhir_version: FhirVersion,
    auth: ProviderAuth,
    client: Client,
}

impl RestFhirProvider {
    /// Creates a provider client from its config table
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the base URL is unusable or the
    /// HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            GatewayError::configuration(format!(
                "provider '{}' has an invalid base_url: {e}",
                config.name
            ))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(GatewayError::configuration(format!(
                "provider '{}' base_url cannot be used as a base",
                config.name
            )));
        }

        let mut client_builder =
            ClientBuilder::new().connect_timeout(Duration::from_secs(config.connect_timeout_seconds));

        if !config.tls_verify {
            tracing::warn!(
                provider = %config.name,
                "TLS certificate verification disabled for provider"
            );
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            GatewayError::configuration(format!(
                "failed to build HTTP client for provider '{}'",
                config.name
            ))
            .with_source(e)
        })?;

        Ok(Self {
            name: config.name.to_string(),
            base_url,
            fhir_version: config.fhir_version,
            auth: ProviderAuth::from_config(config),
            client,
        })
    }

    pub fn fhir_version(&self) -> FhirVersion {
        self.fhir_version
    }

    /// Builds the `$everything` URL for the provider's dialect
    pub fn everything_url(
        &self,
        patient: &PatientIdentifier,
        filters: &EverythingFilters,
    ) -> std::result::Result<Url, ProviderError> {
        let mut url = self.base_url.clone();

        {
            let mut segments = url.path_segments_mut().map_err(|_| ProviderError::InvalidRequest {
                provider: self.name.clone(),
                message: "base URL cannot carry a path".to_string(),
            })?;
            segments.pop_if_empty().push("Patient");
            if self.fhir_version == FhirVersion::R4 {
                segments.push(patient.as_str());
            }
            segments.push("$everything");
        }

        let mut pairs = Vec::new();
        if self.fhir_version == FhirVersion::Stu3 {
            pairs.push(("patient", patient.as_str().to_string()));
        }
        pairs.extend(filters.query_pairs());

        if !pairs.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }

    async fn send(&self, url: Url) -> std::result::Result<Bundle, ProviderError> {
        let mut request = self.client.get(url).header(ACCEPT, FHIR_JSON);
        if let Some(auth) = self.auth.header_value() {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionFailed {
                provider: self.name.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpStatus {
                provider: self.name.clone(),
                status: status.as_u16(),
                message: truncate(&body, 256),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::ConnectionFailed {
                provider: self.name.clone(),
                message: format!("failed to read response body: {e}"),
            })?;

        let bundle: Bundle =
            serde_json::from_slice(&body).map_err(|e| ProviderError::InvalidResponse {
                provider: self.name.clone(),
                message: e.to_string(),
            })?;

        if !bundle.is_bundle() {
            return Err(ProviderError::InvalidResponse {
                provider: self.name.clone(),
                message: format!("expected a Bundle, got '{}'", bundle.resource_type),
            });
        }

        Ok(bundle)
    }
}

#[async_trait]
impl FhirProvider for RestFhirProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    async fn fetch_everything(
        &self,
        patient: &PatientIdentifier,
        filters: &EverythingFilters,
        cancellation: &CancellationSignal,
    ) -> std::result::Result<Bundle, ProviderError> {
        let url = self.everything_url(patient, filters)?;

        tracing::debug!(
            provider = %self.name,
            fhir_version = %self.fhir_version,
            "Requesting $everything bundle"
        );

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(ProviderError::Cancelled {
                provider: self.name.clone(),
            }),
            result = self.send(url) => result,
        }
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
