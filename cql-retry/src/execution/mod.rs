//! Execution of a request over a plan of targets.
//!
//! [`RequestExecutor`] sends attempts of a request to consecutive targets of a plan,
//! consults the retry policy after every failure and applies its decision:
//! - [`RetryDecision::RetrySameTarget`](crate::policies::retry::RetryDecision::RetrySameTarget)
//!   sends another attempt to the same target,
//! - [`RetryDecision::RetryNextTarget`](crate::policies::retry::RetryDecision::RetryNextTarget)
//!   moves on to the next target of the plan,
//! - [`RetryDecision::Ignore`](crate::policies::retry::RetryDecision::Ignore)
//!   finishes the request with [`RunRequestResult::Ignored`],
//! - [`RetryDecision::Rethrow`](crate::policies::retry::RetryDecision::Rethrow)
//!   returns the error of the last attempt.

mod executor;

pub use executor::{RequestExecutor, RequestTarget, RunRequestResult};
