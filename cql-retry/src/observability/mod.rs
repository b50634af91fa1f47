//! Tracing instrumentation of request execution.

pub(crate) mod driver_tracing;
