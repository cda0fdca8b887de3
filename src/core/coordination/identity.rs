//! Caller identity resolution
//!
//! Authentication happens upstream of the gateway; this module only turns
//! the claims it produced into a [`CallerIdentity`].

use crate::domain::access::{CONSUMER_ID_CLAIM, ORGANISATION_CLAIM};
use crate::domain::{CallerClaims, CallerIdentity};

/// Resolves the authenticated caller from presented claims
pub trait IdentityResolver: Send + Sync {
    /// `None` when the claims do not identify a registered consumer
    fn resolve(&self, claims: &CallerClaims) -> Option<CallerIdentity>;
}

/// Reads the `consumer_id` and `organisation_code` claims
#[derive(Debug, Default, Clone)]
pub struct ClaimsIdentityResolver;

impl IdentityResolver for ClaimsIdentityResolver {
    fn resolve(&self, claims: &CallerClaims) -> Option<CallerIdentity> {
        let consumer_id = claims
            .get(CONSUMER_ID_CLAIM)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())?;

        let identity = CallerIdentity::new(consumer_id);
        match claims
            .get(ORGANISATION_CLAIM)
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
        {
            Some(organisation) => Some(identity.with_organisation(organisation)),
            None => Some(identity),
        }
    }
}
