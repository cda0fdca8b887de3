//! Consumer access stores
//!
//! - [`InMemoryConsumerAccessStore`] - grants from `[[access.grants]]`
//! - [`PostgresConsumerAccessStore`] - grants from the `consumer_access` table

pub mod factory;
pub mod memory;
pub mod postgresql;
pub mod traits;

pub use factory::create_access_store;
pub use memory::{AccessGrant, InMemoryConsumerAccessStore};
pub use postgresql::PostgresConsumerAccessStore;
pub use traits::ConsumerAccessStore;
