//! PostgreSQL consumer access store
//!
//! Looks grants up in the `consumer_access` table:
//!
//! ```sql
//! CREATE TABLE consumer_access (
//!     consumer_id         TEXT        NOT NULL,
//!     organisation_code   TEXT        NOT NULL,
//!     patient_identifier  TEXT        NOT NULL,
//!     valid_from          TIMESTAMPTZ,
//!     valid_to            TIMESTAMPTZ,
//!     PRIMARY KEY (consumer_id, organisation_code, patient_identifier)
//! );
//! ```

use super::traits::ConsumerAccessStore;
use crate::config::schema::PostgreSQLConfig;
use crate::domain::{CallerIdentity, Component, GatewayError, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::NoTls;

const ACTIVE_ACCESS_QUERY: &str = "\
    SELECT EXISTS (\
        SELECT 1 FROM consumer_access \
        WHERE patient_identifier = $1 \
          AND consumer_id = $2 \
          AND organisation_code = $3 \
          AND (valid_from IS NULL OR valid_from <= now()) \
          AND (valid_to IS NULL OR valid_to > now())\
    )";

/// Consumer access grants held in PostgreSQL
pub struct PostgresConsumerAccessStore {
    pool: Pool,
}

impl PostgresConsumerAccessStore {
    /// Creates the connection pool
    ///
    /// Connections are opened lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the connection string or TLS
    /// settings are invalid.
    pub fn new(config: &PostgreSQLConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .parse()
            .map_err(|e| {
                GatewayError::configuration("Invalid PostgreSQL connection string").with_source(e)
            })?;

        pg_config.options(&format!(
            "-c statement_timeout={}s",
            config.statement_timeout_seconds
        ));

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = match config.ssl_mode.as_str() {
            "disable" => {
                pg_config.ssl_mode(SslMode::Disable);
                Manager::from_config(pg_config, NoTls, manager_config)
            }
            mode => {
                pg_config.ssl_mode(if mode == "require" {
                    SslMode::Require
                } else {
                    SslMode::Prefer
                });
                let connector = native_tls::TlsConnector::new().map_err(|e| {
                    GatewayError::configuration("Failed to build TLS connector").with_source(e)
                })?;
                Manager::from_config(pg_config, MakeTlsConnector::new(connector), manager_config)
            }
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                GatewayError::configuration("Failed to create PostgreSQL connection pool")
                    .with_source(e)
            })?;

        tracing::info!(
            max_connections = config.max_connections,
            ssl_mode = %config.ssl_mode,
            "PostgreSQL consumer access store ready"
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl ConsumerAccessStore for PostgresConsumerAccessStore {
    async fn has_active_access(&self, identifier: &str, caller: &CallerIdentity) -> Result<bool> {
        let Some(organisation_code) = caller.organisation_code.as_deref() else {
            return Ok(false);
        };

        let client = self.pool.get().await.map_err(|e| {
            GatewayError::dependency(Component::Access, "Failed to get connection from pool")
                .with_source(e)
        })?;

        let row = client
            .query_one(
                ACTIVE_ACCESS_QUERY,
                &[&identifier, &caller.consumer_id, &organisation_code],
            )
            .await
            .map_err(|e| {
                GatewayError::dependency(Component::Access, "Consumer access lookup failed")
                    .with_source(e)
            })?;

        let allowed: bool = row.try_get(0).map_err(|e| {
            GatewayError::dependency(Component::Access, "Unexpected consumer access row")
                .with_source(e)
        })?;

        Ok(allowed)
    }

    fn backend(&self) -> &'static str {
        "postgresql"
    }
}
