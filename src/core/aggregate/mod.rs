//! Patient aggregation
//!
//! Fans one patient query out to every requested provider concurrently, each
//! bounded by its own wait budget, and joins the outcomes in request order.

pub mod service;

pub use service::AggregationService;
