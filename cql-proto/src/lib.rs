//! Defines CQL protocol-level types needed to reason about failed requests.
//!
//! Mainly intended to be used by `cql-retry`, but can also be useful for other
//! applications that need to classify errors returned by a CQL server.

pub mod errors;
pub mod frame;

pub use crate::frame::types::Consistency;
