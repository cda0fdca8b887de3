//! Domain error types
//!
//! fhirgate uses a single tagged error, [`GatewayError`], for everything that
//! crosses a component boundary. The error carries a [`ErrorKind`] (what went
//! wrong, from the caller's point of view) and a [`Component`] (where it was
//! classified), with the original failure preserved as the `source`.
//!
//! Per-provider failures inside aggregation are represented as data using
//! [`ProviderError`] and never escape as a `GatewayError` on their own.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error category as seen by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Malformed or missing input arguments
    Validation,

    /// Caller identity could not be established
    Unauthorized,

    /// Caller has no grant for the requested patient
    Forbidden,

    /// Upstream providers or stores were unavailable
    Dependency,

    /// The caller cancelled the request
    Cancelled,

    /// Provider bundles could not be merged
    Reconciliation,

    /// Unexpected internal fault
    Service,

    /// Invalid configuration
    Configuration,
}

impl ErrorKind {
    /// Whether the caller can correct the error by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::Validation
                | ErrorKind::Unauthorized
                | ErrorKind::Forbidden
                | ErrorKind::Cancelled
        )
    }

    /// Whether repeating the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Dependency)
    }

    /// HTTP status code an API boundary should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::Cancelled => 499,
            ErrorKind::Dependency => 502,
            ErrorKind::Reconciliation | ErrorKind::Service | ErrorKind::Configuration => 500,
        }
    }

    /// Stable, caller-facing description of the category
    pub fn public_message(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "The request was invalid",
            ErrorKind::Unauthorized => "The caller could not be identified",
            ErrorKind::Forbidden => "The caller is not permitted to access this patient",
            ErrorKind::Dependency => "Upstream data providers are unavailable, try again later",
            ErrorKind::Cancelled => "The request was cancelled",
            ErrorKind::Reconciliation => "Patient records could not be reconciled",
            ErrorKind::Service | ErrorKind::Configuration => "An internal error occurred",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "Validation",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Dependency => "Dependency",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Reconciliation => "Reconciliation",
            ErrorKind::Service => "Service",
            ErrorKind::Configuration => "Configuration",
        };
        f.write_str(name)
    }
}

/// Component that classified an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Configuration,
    Registry,
    ProviderClient,
    Aggregation,
    Reconciliation,
    Access,
    Coordination,
    Serialization,
    Audit,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Configuration => "configuration",
            Component::Registry => "provider registry",
            Component::ProviderClient => "provider client",
            Component::Aggregation => "aggregation",
            Component::Reconciliation => "reconciliation",
            Component::Access => "access orchestration",
            Component::Coordination => "coordination",
            Component::Serialization => "serialization",
            Component::Audit => "audit",
        };
        f.write_str(name)
    }
}

/// Main fhirgate error type
///
/// Construct with the kind-specific helpers ([`GatewayError::validation`],
/// [`GatewayError::dependency`], ...) and attach the underlying failure with
/// [`GatewayError::with_source`].
#[derive(Debug, Error)]
#[error("{kind} error in {component}: {message}")]
pub struct GatewayError {
    kind: ErrorKind,
    component: Component,
    message: String,
    #[source]
    source: Option<BoxedSource>,
    logged: bool,
}

impl GatewayError {
    /// Creates a new error of the given kind
    pub fn new(kind: ErrorKind, component: Component, message: impl Into<String>) -> Self {
        Self {
            kind,
            component,
            message: message.into(),
            source: None,
            logged: false,
        }
    }

    pub fn validation(component: Component, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, component, message)
    }

    pub fn unauthorized(component: Component, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, component, message)
    }

    pub fn forbidden(component: Component, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, component, message)
    }

    pub fn dependency(component: Component, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dependency, component, message)
    }

    pub fn cancelled(component: Component) -> Self {
        Self::new(ErrorKind::Cancelled, component, "operation cancelled by caller")
    }

    pub fn reconciliation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Reconciliation, Component::Reconciliation, message)
    }

    pub fn service(component: Component, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Service, component, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, Component::Configuration, message)
    }

    /// Builds a validation error carrying the full violation set
    pub fn invalid(component: Component, violations: ValidationError) -> Self {
        Self::validation(component, violations.to_string()).with_source(violations)
    }

    /// Attaches the underlying cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Caller-facing message that never exposes internal detail
    pub fn public_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation => format!("{}: {}", self.kind.public_message(), self.message),
            _ => self.kind.public_message().to_string(),
        }
    }

    /// Violations attached to a validation error
    pub fn violations(&self) -> &[Violation] {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<ValidationError>())
            .map(|v| v.violations.as_slice())
            .unwrap_or(&[])
    }

    /// Per-provider failures attached to a total dependency failure
    pub fn provider_failures(&self) -> &[(String, String)] {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<ProviderFailures>())
            .map(|f| f.failures.as_slice())
            .unwrap_or(&[])
    }

    /// Whether this error has already been written to the log
    pub fn is_logged(&self) -> bool {
        self.logged
    }

    /// Logs the error once at its point of classification
    ///
    /// Calling this on an already logged error is a no-op, so outer layers
    /// can call it unconditionally without duplicating log lines.
    pub fn logged(mut self) -> Self {
        if self.logged {
            return self;
        }

        let cause = self.source.as_ref().map(|s| s.to_string());
        if self.kind.is_client_error() {
            tracing::warn!(
                kind = %self.kind,
                component = %self.component,
                cause = cause.as_deref().unwrap_or(""),
                "{}",
                self.message
            );
        } else {
            tracing::error!(
                kind = %self.kind,
                component = %self.component,
                cause = cause.as_deref().unwrap_or(""),
                "{}",
                self.message
            );
        }

        self.logged = true;
        self
    }

    /// Re-tags an error that a component does not recognise as a service error
    ///
    /// Errors whose kind is in `recognised` pass through unchanged; anything
    /// else is wrapped so collaborator-internal shapes never reach the caller.
    pub fn classify(self, component: Component, recognised: &[ErrorKind]) -> Self {
        if recognised.contains(&self.kind) {
            return self;
        }

        let logged = self.logged;
        let mut wrapped = GatewayError::service(
            component,
            format!("unexpected failure in {}", self.component),
        )
        .with_source(self);
        wrapped.logged = logged;
        wrapped
    }
}

/// A single failed validation rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the offending argument
    pub field: String,

    /// Human readable reason
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Collected validation violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", .violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

/// Every provider's failure reason from a total dependency failure
#[derive(Debug, Clone, Error)]
#[error("{}", .failures.iter().map(|(p, r)| format!("{p}: {r}")).collect::<Vec<_>>().join("; "))]
pub struct ProviderFailures {
    pub failures: Vec<(String, String)>,
}

/// Failure of a single upstream provider call
///
/// Every variant names the provider so the detail stays meaningful once it is
/// collected alongside its siblings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Failed to reach the provider
    #[error("{provider}: connection failed: {message}")]
    ConnectionFailed { provider: String, message: String },

    /// Provider answered with a non-success status
    #[error("{provider}: HTTP {status}: {message}")]
    HttpStatus {
        provider: String,
        status: u16,
        message: String,
    },

    /// Provider returned a body that is not a FHIR bundle
    #[error("{provider}: invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    /// The outbound request could not be built
    #[error("{provider}: invalid request: {message}")]
    InvalidRequest { provider: String, message: String },

    /// The in-flight call was aborted by the caller's cancellation
    #[error("{provider}: cancelled")]
    Cancelled { provider: String },

    /// The provider's unit of work faulted unexpectedly
    #[error("{provider}: internal failure: {message}")]
    Internal { provider: String, message: String },
}

impl ProviderError {
    /// Name of the provider that failed
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::ConnectionFailed { provider, .. }
            | ProviderError::HttpStatus { provider, .. }
            | ProviderError::InvalidResponse { provider, .. }
            | ProviderError::InvalidRequest { provider, .. }
            | ProviderError::Cancelled { provider }
            | ProviderError::Internal { provider, .. } => provider,
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::service(Component::Coordination, "I/O failure").with_source(err)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::service(Component::Serialization, "JSON serialization failed")
            .with_source(err)
    }
}

impl From<toml::de::Error> for GatewayError {
    fn from(err: toml::de::Error) -> Self {
        GatewayError::configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::validation(Component::Coordination, "patient is blank");
        assert_eq!(
            err.to_string(),
            "Validation error in coordination: patient is blank"
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert!(ErrorKind::Validation.is_client_error());
        assert!(ErrorKind::Forbidden.is_client_error());
        assert!(!ErrorKind::Dependency.is_client_error());
        assert!(ErrorKind::Dependency.is_retryable());
        assert_eq!(ErrorKind::Unauthorized.status_code(), 401);
        assert_eq!(ErrorKind::Forbidden.status_code(), 403);
        assert_eq!(ErrorKind::Dependency.status_code(), 502);
        assert_eq!(ErrorKind::Service.status_code(), 500);
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = GatewayError::service(Component::Aggregation, "JoinError: task 12 panicked");
        assert!(!err.public_message().contains("JoinError"));
        assert_eq!(err.public_message(), "An internal error occurred");
    }

    #[test]
    fn test_violations_are_reachable() {
        let violations = ValidationError {
            violations: vec![
                Violation {
                    field: "patient_identifier".to_string(),
                    message: "must not be blank".to_string(),
                },
                Violation {
                    field: "count".to_string(),
                    message: "must be positive".to_string(),
                },
            ],
        };
        let err = GatewayError::invalid(Component::Coordination, violations);

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.violations().len(), 2);
        assert!(err.message().contains("count: must be positive"));
    }

    #[test]
    fn test_classify_wraps_unrecognised() {
        let err = GatewayError::configuration("bad pool");
        let wrapped = err.classify(Component::Access, &[ErrorKind::Forbidden]);

        assert_eq!(wrapped.kind(), ErrorKind::Service);
        assert_eq!(wrapped.component(), Component::Access);
        assert!(std::error::Error::source(&wrapped).is_some());
    }

    #[test]
    fn test_classify_keeps_recognised() {
        let err = GatewayError::forbidden(Component::Access, "no grant");
        let kept = err.classify(Component::Coordination, &[ErrorKind::Forbidden]);
        assert_eq!(kept.kind(), ErrorKind::Forbidden);
        assert_eq!(kept.component(), Component::Access);
    }

    #[test]
    fn test_logged_is_idempotent() {
        let err = GatewayError::dependency(Component::Aggregation, "all providers failed");
        assert!(!err.is_logged());
        let err = err.logged();
        assert!(err.is_logged());
        let err = err.logged();
        assert!(err.is_logged());
    }

    #[test]
    fn test_classify_preserves_logged_flag() {
        let err = GatewayError::configuration("x").logged();
        let wrapped = err.classify(Component::Coordination, &[]);
        assert!(wrapped.is_logged());
    }

    #[test]
    fn test_provider_error_names_provider() {
        let err = ProviderError::HttpStatus {
            provider: "LDS".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.provider(), "LDS");
        assert_eq!(err.to_string(), "LDS: HTTP 503: unavailable");
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: GatewayError = json_err.into();
        assert_eq!(err.kind(), ErrorKind::Service);
        assert_eq!(err.component(), Component::Serialization);
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: GatewayError = toml_err.into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("TOML parse error"));
    }
}
