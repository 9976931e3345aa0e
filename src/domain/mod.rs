//! Domain layer for the belt monitoring core.
//!
//! Holds the defect / variation / conveyor-status models, the port traits the
//! services depend on, and the shared error type.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, ErrorCategory};
