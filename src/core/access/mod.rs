//! Access orchestration
//!
//! The consumer-access gate and the salted identifier hash it can look
//! grants up by.

pub mod hashing;
pub mod orchestrator;

pub use hashing::hash_identifier;
pub use orchestrator::AccessOrchestrator;
