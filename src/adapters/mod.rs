//! External system integrations for fhirgate.
//!
//! - [`fhir`] - Upstream FHIR provider clients (R4 and STU3)
//! - [`access`] - Consumer access grant stores (in-memory, PostgreSQL)
//!
//! Both sit behind traits so the core can be exercised with in-process
//! doubles.

pub mod access;
pub mod fhir;
