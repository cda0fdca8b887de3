//! Result type alias for fhirgate

use super::errors::GatewayError;

/// Result type alias for fhirgate operations
///
/// # Examples
///
/// ```
/// use fhirgate::domain::errors::{Component, GatewayError};
/// use fhirgate::domain::result::Result;
///
/// fn failing_function() -> Result<()> {
///     Err(GatewayError::validation(Component::Coordination, "patient is blank"))
/// }
/// ```
pub type Result<T> = std::result::Result<T, GatewayError>;
