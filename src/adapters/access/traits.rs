//! Consumer access store trait
//!
//! This module defines the lookup the access gate needs from whatever holds
//! consumer access grants.

use crate::domain::{CallerIdentity, Result};
use async_trait::async_trait;

/// Read-only view over consumer access grants
#[async_trait]
pub trait ConsumerAccessStore: Send + Sync {
    /// Whether `caller` holds a grant covering `identifier` that is valid now
    ///
    /// `identifier` is the patient identifier, or its salted hash when
    /// identifier hashing is enabled. A grant matches when its consumer id
    /// and organisation code both equal the caller's.
    ///
    /// # Errors
    ///
    /// Returns a `Dependency` error if the backing store cannot be queried.
    async fn has_active_access(&self, identifier: &str, caller: &CallerIdentity) -> Result<bool>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}
