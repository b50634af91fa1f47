//! Request retries configurations\
//! To decide what to do after a failed attempt the driver consults an object
//! implementing the [`RetryPolicy`] trait and, if available, its
//! [`ExtendedRetryPolicy`] superset.
//!
//! Policies are shared by all requests of a session and are called on the hot
//! path of request completion. Decision methods take `&self`, must not block
//! and must not keep per-request state: everything needed to decide, including
//! the number of retries already performed, is passed in the `*Info` argument.

use std::sync::Arc;

use tracing::debug;

use crate::errors::{BrokenConnectionError, DbError, RequestAttemptError, WriteType};
use crate::frame::types::Consistency;
use crate::statement::Statement;

/// The outcome of a retry policy evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry on the same target. `None` means that the consistency of the failed attempt should be used.
    RetrySameTarget(Option<Consistency>),
    /// Retry on the next target of the plan. `None` means the same as above.
    RetryNextTarget(Option<Consistency>),
    /// Treat the failed attempt as a success yielding no rows.
    Ignore,
    /// Give up and return the error to the caller.
    Rethrow,
}

/// Information about a read that timed out on the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct ReadTimeoutInfo<'a> {
    /// The statement whose attempt failed.
    pub statement: &'a Statement,
    /// Consistency level of the failed read, as reported by the coordinator.
    pub consistency: Consistency,
    /// Number of replica responses required to achieve the consistency level.
    pub required_responses: i32,
    /// Number of replica responses that arrived before the timeout.
    pub received_responses: i32,
    /// Whether the replica that was asked for data has responded.
    pub data_retrieved: bool,
    /// Number of retries already performed for this request.
    pub retry_count: u32,
}

/// Information about a write that timed out on the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct WriteTimeoutInfo<'a> {
    /// The statement whose attempt failed.
    pub statement: &'a Statement,
    /// Consistency level of the failed write, as reported by the coordinator.
    pub consistency: Consistency,
    /// Type of the write that timed out.
    pub write_type: &'a WriteType,
    /// Number of acknowledgements required to achieve the consistency level.
    pub required_acks: i32,
    /// Number of acknowledgements that arrived before the timeout.
    pub received_acks: i32,
    /// Number of retries already performed for this request.
    pub retry_count: u32,
}

/// Information about a request refused because too few replicas were alive.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableInfo<'a> {
    /// The statement whose attempt failed.
    pub statement: &'a Statement,
    /// Requested consistency level, as reported by the coordinator.
    pub consistency: Consistency,
    /// Number of replicas that have to be alive to achieve the consistency level.
    pub required_replicas: i32,
    /// Number of replicas that the coordinator knew to be alive.
    pub alive_replicas: i32,
    /// Number of retries already performed for this request.
    pub retry_count: u32,
}

/// Information about an attempt that received no response in time.
#[derive(Debug, Clone, Copy)]
pub struct ClientTimeoutInfo<'a> {
    /// The statement whose attempt failed.
    pub statement: &'a Statement,
    /// Consistency level of the failed attempt.
    pub consistency: Consistency,
    /// Number of retries already performed for this request.
    pub retry_count: u32,
}

/// Information about an attempt whose connection broke before a response arrived.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionErrorInfo<'a> {
    /// The statement whose attempt failed.
    pub statement: &'a Statement,
    /// Consistency level of the failed attempt.
    pub consistency: Consistency,
    /// The error with which the connection broke.
    pub error: &'a BrokenConnectionError,
    /// Number of retries already performed for this request.
    pub retry_count: u32,
}

/// Information about an attempt which failed with an uncommon server error,
/// e.g. overloaded coordinator, internal server error, bootstrapping node.
#[derive(Debug, Clone, Copy)]
pub struct UnexpectedErrorInfo<'a> {
    /// The statement whose attempt failed.
    pub statement: &'a Statement,
    /// Consistency level of the failed attempt.
    pub consistency: Consistency,
    /// The error with which the attempt failed.
    pub error: &'a RequestAttemptError,
    /// Number of retries already performed for this request.
    pub retry_count: u32,
}

/// Specifies a policy used to decide what to do after an attempt failed with
/// one of the errors defined by the protocol for quorum operations.
///
/// If an implementation can't decide, it should return [`RetryDecision::Rethrow`].
pub trait RetryPolicy: std::fmt::Debug + Send + Sync {
    /// Called when the coordinator did not receive enough replica responses to a read in time.
    fn on_read_timeout(&self, info: ReadTimeoutInfo<'_>) -> RetryDecision;

    /// Called when the coordinator did not receive enough replica acknowledgements to a write in time.
    /// The write may have been applied on some replicas.
    fn on_write_timeout(&self, info: WriteTimeoutInfo<'_>) -> RetryDecision;

    /// Called when the coordinator knew that not enough replicas were alive,
    /// so the request was not even attempted.
    fn on_unavailable(&self, info: UnavailableInfo<'_>) -> RetryDecision;
}

/// Superset of [`RetryPolicy`] for failures that happen outside the coordinator's
/// quorum logic: client timeouts, broken connections and other server errors.
///
/// This is a separate trait so that implementations of [`RetryPolicy`] keep
/// compiling and keep their behaviour. Policies which only implement
/// [`RetryPolicy`] are handled by a fixed fallback, see [`ConfiguredRetryPolicy`].
pub trait ExtendedRetryPolicy: RetryPolicy {
    /// Called when no response arrived within the client-side timeout.
    /// If [`RetryDecision::Rethrow`] is returned, the caller gets a request timeout error.
    fn on_client_timeout(&self, info: ClientTimeoutInfo<'_>) -> RetryDecision;

    /// Called when the connection to the target broke before a response was obtained.
    fn on_connection_error(&self, info: ConnectionErrorInfo<'_>) -> RetryDecision;

    /// Called when the target replied with an error that is neither a timeout
    /// nor unavailability, e.g. overloaded, internal server error, bootstrapping.
    fn on_unexpected_error(&self, info: UnexpectedErrorInfo<'_>) -> RetryDecision;
}

/// A retry policy together with the capabilities it was configured with.
///
/// Requests are executed with this type rather than with a bare trait object:
/// the variant records whether the policy can be asked about the failures
/// introduced by [`ExtendedRetryPolicy`].
///
/// For [`ConfiguredRetryPolicy::Base`] the three extended categories are
/// answered by a compatibility shim that never calls the policy: retry once
/// on the next target with unchanged consistency, then rethrow.
#[derive(Debug, Clone)]
pub enum ConfiguredRetryPolicy {
    /// A policy implementing only [`RetryPolicy`].
    Base(Arc<dyn RetryPolicy>),
    /// A policy implementing [`ExtendedRetryPolicy`].
    Extended(Arc<dyn ExtendedRetryPolicy>),
}

impl ConfiguredRetryPolicy {
    /// Wraps a policy implementing only the base contract.
    pub fn base(policy: Arc<dyn RetryPolicy>) -> Self {
        Self::Base(policy)
    }

    /// Wraps a policy implementing the extended contract.
    pub fn extended(policy: Arc<dyn ExtendedRetryPolicy>) -> Self {
        Self::Extended(policy)
    }

    /// Whether client timeouts, connection errors and unexpected errors
    /// are decided by the policy itself rather than by the fallback.
    pub fn supports_extended(&self) -> bool {
        matches!(self, Self::Extended(_))
    }

    /// See [`RetryPolicy::on_read_timeout`].
    pub fn on_read_timeout(&self, info: ReadTimeoutInfo<'_>) -> RetryDecision {
        match self {
            Self::Base(policy) => policy.on_read_timeout(info),
            Self::Extended(policy) => policy.on_read_timeout(info),
        }
    }

    /// See [`RetryPolicy::on_write_timeout`].
    pub fn on_write_timeout(&self, info: WriteTimeoutInfo<'_>) -> RetryDecision {
        match self {
            Self::Base(policy) => policy.on_write_timeout(info),
            Self::Extended(policy) => policy.on_write_timeout(info),
        }
    }

    /// See [`RetryPolicy::on_unavailable`].
    pub fn on_unavailable(&self, info: UnavailableInfo<'_>) -> RetryDecision {
        match self {
            Self::Base(policy) => policy.on_unavailable(info),
            Self::Extended(policy) => policy.on_unavailable(info),
        }
    }

    /// See [`ExtendedRetryPolicy::on_client_timeout`].
    pub fn on_client_timeout(&self, info: ClientTimeoutInfo<'_>) -> RetryDecision {
        match self {
            Self::Base(_) => fallback_decision("client timeout", info.retry_count),
            Self::Extended(policy) => policy.on_client_timeout(info),
        }
    }

    /// See [`ExtendedRetryPolicy::on_connection_error`].
    pub fn on_connection_error(&self, info: ConnectionErrorInfo<'_>) -> RetryDecision {
        match self {
            Self::Base(_) => fallback_decision("connection error", info.retry_count),
            Self::Extended(policy) => policy.on_connection_error(info),
        }
    }

    /// See [`ExtendedRetryPolicy::on_unexpected_error`].
    pub fn on_unexpected_error(&self, info: UnexpectedErrorInfo<'_>) -> RetryDecision {
        match self {
            Self::Base(_) => fallback_decision("unexpected error", info.retry_count),
            Self::Extended(policy) => policy.on_unexpected_error(info),
        }
    }

    /// Classifies the error of a failed attempt and asks the policy
    /// (or the fallback) for a decision.
    ///
    /// `consistency` is the consistency of the failed attempt. For read timeouts,
    /// write timeouts and unavailability the consistency reported by the
    /// coordinator is passed to the policy instead.
    ///
    /// Errors that can't be fixed by retrying (syntax errors, authorization
    /// errors, ...) are rethrown without consulting the policy.
    pub fn decide(
        &self,
        statement: &Statement,
        consistency: Consistency,
        error: &RequestAttemptError,
        retry_count: u32,
    ) -> RetryDecision {
        // Do not remove this lint!
        // It's there for a reason - we don't want new variants
        // automatically fall under `_` pattern when they are introduced.
        #[deny(clippy::wildcard_enum_match_arm)]
        match error {
            RequestAttemptError::DbError(db_error, _) => {
                #[deny(clippy::wildcard_enum_match_arm)]
                match db_error {
                    DbError::ReadTimeout {
                        consistency,
                        received,
                        required,
                        data_present,
                    } => self.on_read_timeout(ReadTimeoutInfo {
                        statement,
                        consistency: *consistency,
                        required_responses: *required,
                        received_responses: *received,
                        data_retrieved: *data_present,
                        retry_count,
                    }),
                    DbError::WriteTimeout {
                        consistency,
                        received,
                        required,
                        write_type,
                    } => self.on_write_timeout(WriteTimeoutInfo {
                        statement,
                        consistency: *consistency,
                        write_type,
                        required_acks: *required,
                        received_acks: *received,
                        retry_count,
                    }),
                    DbError::Unavailable {
                        consistency,
                        required,
                        alive,
                    } => self.on_unavailable(UnavailableInfo {
                        statement,
                        consistency: *consistency,
                        required_replicas: *required,
                        alive_replicas: *alive,
                        retry_count,
                    }),
                    // Problems of the contacted node, another one may succeed.
                    DbError::Overloaded
                    | DbError::ServerError
                    | DbError::TruncateError
                    | DbError::IsBootstrapping => self.on_unexpected_error(UnexpectedErrorInfo {
                        statement,
                        consistency,
                        error,
                        retry_count,
                    }),
                    // Retrying won't help with any of these.
                    DbError::Rejected(_) | DbError::Other(_) => RetryDecision::Rethrow,
                }
            }
            RequestAttemptError::BrokenConnectionError(connection_error) => {
                self.on_connection_error(ConnectionErrorInfo {
                    statement,
                    consistency,
                    error: connection_error,
                    retry_count,
                })
            }
            RequestAttemptError::UnableToAllocStreamId => {
                self.on_unexpected_error(UnexpectedErrorInfo {
                    statement,
                    consistency,
                    error,
                    retry_count,
                })
            }
            RequestAttemptError::ClientTimeout(_) => self.on_client_timeout(ClientTimeoutInfo {
                statement,
                consistency,
                retry_count,
            }),
        }
    }
}

impl From<Arc<dyn RetryPolicy>> for ConfiguredRetryPolicy {
    fn from(policy: Arc<dyn RetryPolicy>) -> Self {
        Self::Base(policy)
    }
}

impl From<Arc<dyn ExtendedRetryPolicy>> for ConfiguredRetryPolicy {
    fn from(policy: Arc<dyn ExtendedRetryPolicy>) -> Self {
        Self::Extended(policy)
    }
}

/// Behaviour for extended failure categories when the configured policy
/// implements only [`RetryPolicy`].
fn fallback_decision(category: &'static str, retry_count: u32) -> RetryDecision {
    let decision = if retry_count == 0 {
        RetryDecision::RetryNextTarget(None)
    } else {
        RetryDecision::Rethrow
    };
    debug!(
        category,
        retry_count,
        ?decision,
        "Configured retry policy does not handle this failure, applied the fallback"
    );
    decision
}
