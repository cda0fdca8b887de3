//! FHIR Bundle domain model
//!
//! Only the bundle envelope is modelled. Resources stay as opaque JSON; the
//! gateway reads nothing from them beyond `resourceType` and `id`.

use super::ids::ResourceKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const BUNDLE_RESOURCE_TYPE: &str = "Bundle";

/// FHIR Bundle type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Document,
    Message,
    Transaction,
    TransactionResponse,
    Batch,
    BatchResponse,
    History,
    Searchset,
    Collection,
}

impl BundleType {
    /// Whether entries of this bundle type can be merged as search results
    pub fn is_mergeable(&self) -> bool {
        matches!(self, BundleType::Searchset | BundleType::Collection)
    }
}

/// Bundle `meta` element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    /// Remaining meta fields, passed through untouched
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// A single bundle entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<Value>,

    /// Remaining entry fields (`request`, `response`, extensions)
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl BundleEntry {
    /// Creates an entry wrapping a resource, deriving `fullUrl` from its identity
    pub fn from_resource(resource: Value) -> Self {
        let full_url = resource_key(&resource).map(|key| key.to_string());
        Self {
            full_url,
            resource: Some(resource),
            search: None,
            other: Map::new(),
        }
    }

    /// Identity of the wrapped resource, if it has both a type and an id
    pub fn key(&self) -> Option<ResourceKey> {
        self.resource.as_ref().and_then(resource_key)
    }

    /// Whether the entry carries a resource object
    pub fn has_resource(&self) -> bool {
        matches!(self.resource, Some(Value::Object(_)))
    }
}

fn resource_key(resource: &Value) -> Option<ResourceKey> {
    let resource_type = resource.get("resourceType")?.as_str()?;
    let id = resource.get("id")?.as_str()?;
    ResourceKey::new(resource_type, id).ok()
}

/// FHIR Bundle envelope
///
/// # Examples
///
/// ```
/// use fhirgate::domain::bundle::{Bundle, BundleEntry};
/// use serde_json::json;
///
/// let bundle = Bundle::searchset(vec![BundleEntry::from_resource(
///     json!({"resourceType": "Patient", "id": "1"}),
/// )]);
/// assert_eq!(bundle.total, Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<BundleMeta>,

    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,

    /// Remaining envelope fields (`link`, `timestamp`, `signature`)
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Bundle {
    /// Creates a searchset bundle whose total matches its entries
    pub fn searchset(entry: Vec<BundleEntry>) -> Self {
        Self {
            resource_type: BUNDLE_RESOURCE_TYPE.to_string(),
            id: None,
            meta: None,
            bundle_type: BundleType::Searchset,
            total: Some(entry.len()),
            entry,
            other: Map::new(),
        }
    }

    /// Whether the envelope declares itself as a FHIR Bundle
    pub fn is_bundle(&self) -> bool {
        self.resource_type == BUNDLE_RESOURCE_TYPE
    }

    /// Time the bundle was last updated, if stamped
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.meta.as_ref().and_then(|m| m.last_updated)
    }

    /// Sets the envelope id and `meta.lastUpdated`
    pub fn stamp(mut self, id: impl Into<String>, last_updated: DateTime<Utc>) -> Self {
        self.id = Some(id.into());
        let meta = self.meta.get_or_insert_with(BundleMeta::default);
        meta.last_updated = Some(last_updated);
        self
    }
}
