//! Request coordination
//!
//! A request moves through
//! `Received -> Validated -> AccessChecked -> Aggregated -> Reconciled ->
//! Serialized -> Returned`, or to `Errored` from any non-terminal state.

pub mod coordinator;
pub mod identity;
pub mod serializer;
pub mod state;

pub use coordinator::{Coordinator, EverythingRequest, SerializedBundle};
pub use identity::{ClaimsIdentityResolver, IdentityResolver};
pub use serializer::{BundleSerializer, JsonBundleSerializer, FHIR_JSON_CONTENT_TYPE};
pub use state::{CoordinationState, StateTracker};
