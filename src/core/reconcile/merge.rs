//! Primary-precedence merge of provider bundles
//!
//! Processing order is the primary provider first (when it succeeded), then
//! every other successful provider in request order. The first version of a
//! resource key seen wins; later copies are recorded as superseded. Entries
//! without a usable key cannot be matched and are kept as they arrive.

use crate::domain::{
    Bundle, BundleEntry, GatewayError, ProviderName, ProviderOutcome, ResourceKey, Result,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Envelope metadata applied to the merged bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleStamp {
    pub id: String,
    pub last_updated: DateTime<Utc>,
}

impl BundleStamp {
    pub fn new(id: impl Into<String>, last_updated: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            last_updated,
        }
    }

    /// A fresh random id stamped with the current time
    pub fn now() -> Self {
        Self::new(Uuid::new_v4().to_string(), Utc::now())
    }
}

/// Where a merged entry came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryProvenance {
    /// Resource identity, `None` for entries without `resourceType`/`id`
    pub key: Option<ResourceKey>,

    /// Provider whose version was kept
    pub source: ProviderName,

    /// Providers whose copy of the same resource was discarded
    pub superseded: Vec<ProviderName>,
}

/// Merged bundle with per-entry provenance
///
/// `provenance[i]` describes `bundle.entry[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledBundle {
    pub bundle: Bundle,
    pub provenance: Vec<EntryProvenance>,
}

impl ReconciledBundle {
    /// Number of entries where another provider's copy was overridden
    pub fn conflict_count(&self) -> usize {
        self.provenance
            .iter()
            .filter(|p| !p.superseded.is_empty())
            .count()
    }
}

/// Merges successful outcomes into a single searchset bundle
///
/// Pure: the same outcomes, primary and stamp always produce the same result.
///
/// # Errors
///
/// Returns a `Reconciliation` error if no outcome succeeded, or if a
/// successful bundle is not a searchset/collection or has an entry without a
/// resource object.
pub fn reconcile(
    outcomes: &[ProviderOutcome],
    primary: Option<&ProviderName>,
    stamp: BundleStamp,
) -> Result<ReconciledBundle> {
    let mut successes: Vec<(&ProviderName, &Bundle)> = outcomes
        .iter()
        .filter_map(|o| o.bundle().map(|bundle| (&o.provider_name, bundle)))
        .collect();

    if successes.is_empty() {
        return Err(GatewayError::reconciliation(
            "no successful provider bundles to reconcile",
        ));
    }

    for (provider, bundle) in &successes {
        check_mergeable(provider, bundle)?;
    }

    if let Some(primary) = primary {
        if let Some(pos) = successes.iter().position(|(name, _)| *name == primary) {
            let primary_bundle = successes.remove(pos);
            successes.insert(0, primary_bundle);
        }
    }

    let mut entries: Vec<BundleEntry> = Vec::new();
    let mut provenance: Vec<EntryProvenance> = Vec::new();
    let mut index: HashMap<ResourceKey, usize> = HashMap::new();

    for (provider, bundle) in successes {
        for entry in &bundle.entry {
            let key = entry.key();

            if let Some(ref key) = key {
                if let Some(&existing) = index.get(key) {
                    let kept = &mut provenance[existing];
                    if kept.source != *provider && !kept.superseded.contains(provider) {
                        kept.superseded.push(provider.clone());
                    }
                    continue;
                }
                index.insert(key.clone(), entries.len());
            }

            entries.push(entry.clone());
            provenance.push(EntryProvenance {
                key,
                source: provider.clone(),
                superseded: Vec::new(),
            });
        }
    }

    let bundle = Bundle::searchset(entries).stamp(stamp.id, stamp.last_updated);

    Ok(ReconciledBundle { bundle, provenance })
}

/// [`reconcile`] with a fresh [`BundleStamp`]
pub fn reconcile_now(
    outcomes: &[ProviderOutcome],
    primary: Option<&ProviderName>,
) -> Result<ReconciledBundle> {
    reconcile(outcomes, primary, BundleStamp::now())
}

fn check_mergeable(provider: &ProviderName, bundle: &Bundle) -> Result<()> {
    if !bundle.bundle_type.is_mergeable() {
        return Err(GatewayError::reconciliation(format!(
            "malformed bundle from provider '{provider}': type {:?} cannot be merged",
            bundle.bundle_type
        )));
    }

    if let Some(pos) = bundle.entry.iter().position(|e| !e.has_resource()) {
        return Err(GatewayError::reconciliation(format!(
            "malformed bundle from provider '{provider}': entry {pos} has no resource"
        )));
    }

    Ok(())
}
