//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through the gateway. Each
//! type rejects blank input so the rest of the crate never sees an empty id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Patient identifier newtype wrapper
///
/// Opaque identifier of the patient whose records are requested, typically an
/// NHS number. Surrounding whitespace is trimmed.
///
/// # Examples
///
/// ```
/// use fhirgate::domain::ids::PatientIdentifier;
/// use std::str::FromStr;
///
/// let patient = PatientIdentifier::from_str(" 9434765919 ").unwrap();
/// assert_eq!(patient.as_str(), "9434765919");
/// assert_eq!(format!("{patient:?}"), "PatientIdentifier(******5919)");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatientIdentifier(String);

impl PatientIdentifier {
    /// Trims the identifier, rejecting blank input
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Patient identifier cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Only the last four characters are shown
impl fmt::Debug for PatientIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible = self.0.char_indices().rev().nth(3).map_or(self.0.len(), |(i, _)| i);
        let hidden = self.0[..visible].chars().count();
        write!(f, "PatientIdentifier({}{})", "*".repeat(hidden), &self.0[visible..])
    }
}

impl fmt::Display for PatientIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PatientIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for PatientIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Provider name newtype wrapper
///
/// Names an upstream FHIR data provider as configured in the registry
/// (e.g. `DDS`, `LDS`). Names compare exactly; no case folding is applied.
///
/// # Examples
///
/// ```
/// use fhirgate::domain::ids::ProviderName;
///
/// let name = ProviderName::new("DDS").unwrap();
/// assert_eq!(name.as_str(), "DDS");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderName(String);

impl ProviderName {
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err("Provider name cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the provider name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProviderName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProviderName> for String {
    fn from(name: ProviderName) -> Self {
        name.0
    }
}

impl AsRef<str> for ProviderName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity of a FHIR resource inside a bundle
///
/// Two entries from different providers describe the same clinical entity
/// when their resource type and logical id are equal.
///
/// # Examples
///
/// ```
/// use fhirgate::domain::ids::ResourceKey;
///
/// let key = ResourceKey::new("Patient", "1").unwrap();
/// assert_eq!(key.to_string(), "Patient/1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    resource_type: String,
    id: String,
}

impl ResourceKey {
    /// Creates a new ResourceKey
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Result<Self, String> {
        let resource_type = resource_type.into();
        let id = id.into();

        if resource_type.trim().is_empty() {
            return Err("Resource type cannot be empty".to_string());
        }
        if id.trim().is_empty() {
            return Err("Resource id cannot be empty".to_string());
        }

        Ok(Self { resource_type, id })
    }

    /// Returns the FHIR resource type (e.g. `Observation`)
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the logical resource id
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

impl FromStr for ResourceKey {
    type Err = String;

    /// Parses a relative reference such as `Observation/9`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource_type, id) = s
            .split_once('/')
            .ok_or_else(|| format!("Invalid resource reference '{s}', expected Type/id"))?;
        Self::new(resource_type, id)
    }
}
