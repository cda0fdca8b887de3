//! Bundle reconciliation
//!
//! Merges the successful per-provider bundles into one searchset, keyed by
//! `resourceType/id`, with the primary provider's version winning conflicts.

pub mod merge;

pub use merge::{reconcile, reconcile_now, BundleStamp, EntryProvenance, ReconciledBundle};
