//! Consumer access store factory
//!
//! Creates the configured access store backend.

use super::memory::InMemoryConsumerAccessStore;
use super::postgresql::PostgresConsumerAccessStore;
use super::traits::ConsumerAccessStore;
use crate::config::schema::{AccessBackend, AccessConfig};
use crate::domain::{GatewayError, Result};
use std::sync::Arc;

/// Create a consumer access store based on the configuration
///
/// # Errors
///
/// Returns a `Configuration` error if the PostgreSQL backend is selected
/// without its settings, or its pool cannot be created.
pub fn create_access_store(config: &AccessConfig) -> Result<Arc<dyn ConsumerAccessStore>> {
    match config.backend {
        AccessBackend::Memory => {
            tracing::info!(grants = config.grants.len(), "Creating in-memory access store");
            Ok(Arc::new(InMemoryConsumerAccessStore::from_config(
                &config.grants,
            )))
        }
        AccessBackend::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                GatewayError::configuration(
                    "access.postgresql configuration is required when backend = 'postgresql'",
                )
            })?;

            tracing::info!("Creating PostgreSQL access store");
            Ok(Arc::new(PostgresConsumerAccessStore::new(pg_config)?))
        }
    }
}
