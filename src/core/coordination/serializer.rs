//! Bundle serialization

use crate::domain::{Bundle, Component, GatewayError, Result};

pub const FHIR_JSON_CONTENT_TYPE: &str = "application/fhir+json";

/// Turns the reconciled bundle into the response body
pub trait BundleSerializer: Send + Sync {
    fn serialize(&self, bundle: &Bundle) -> Result<String>;

    fn content_type(&self) -> &'static str {
        FHIR_JSON_CONTENT_TYPE
    }
}

/// FHIR JSON, compact or pretty-printed
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBundleSerializer {
    pub pretty: bool,
}

impl JsonBundleSerializer {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl BundleSerializer for JsonBundleSerializer {
    fn serialize(&self, bundle: &Bundle) -> Result<String> {
        let body = if self.pretty {
            serde_json::to_string_pretty(bundle)
        } else {
            serde_json::to_string(bundle)
        };

        body.map_err(|e| {
            GatewayError::service(Component::Serialization, "failed to serialize bundle")
                .with_source(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BundleEntry;
    use serde_json::{json, Value};

    #[test]
    fn test_compact_and_pretty() {
        let bundle = Bundle::searchset(vec![BundleEntry::from_resource(
            json!({"resourceType": "Patient", "id": "p1"}),
        )]);

        let compact = JsonBundleSerializer::new(false).serialize(&bundle).unwrap();
        let pretty = JsonBundleSerializer::new(true).serialize(&bundle).unwrap();

        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));

        let parsed: Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(parsed["resourceType"], "Bundle");
        assert_eq!(parsed["type"], "searchset");
        assert_eq!(parsed["total"], 1);
        assert_eq!(parsed["entry"][0]["fullUrl"], "Patient/p1");
        assert_eq!(
            serde_json::from_str::<Value>(&pretty).unwrap(),
            parsed
        );
    }
}
