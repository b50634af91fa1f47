//! This module contains the errors which are inputs to retry decisions
//! and the errors returned to the caller once a request is given up.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub use cql_proto::errors::{DbError, RejectionReason, WriteType};

use itertools::Itertools;
use thiserror::Error;

/// An error that occurred during a single attempt of a request,
/// i.e. while a request was being executed on one particular target.
///
/// Every variant is classified by the retry policy machinery into one of
/// the retry categories (read timeout, write timeout, unavailable,
/// client timeout, connection error, unexpected error) or is considered
/// not retryable at all.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RequestAttemptError {
    /// Database sent a response containing some error with a message
    #[error("Database returned an error: {0}, Error message: {1}")]
    DbError(DbError, String),

    /// Failed to run a request because the connection to the target broke
    /// before a response was obtained.
    #[error(transparent)]
    BrokenConnectionError(#[from] BrokenConnectionError),

    /// Connection to the target is overloaded, no stream id was available.
    #[error("Unable to allocate stream id")]
    UnableToAllocStreamId,

    /// No response arrived within the client-side timeout.
    /// The outcome of the request on the server is unknown.
    #[error("Client timeout: no response within {0:?}")]
    ClientTimeout(Duration),
}

impl RequestAttemptError {
    /// Returns the database error carried by this attempt error, if any.
    pub fn db_error(&self) -> Option<&DbError> {
        match self {
            RequestAttemptError::DbError(db_error, _) => Some(db_error),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BrokenConnectionError {
    fn from(io_error: std::io::Error) -> BrokenConnectionError {
        BrokenConnectionErrorKind::IoError(Arc::new(io_error)).into()
    }
}

/// Error that occurred when the connection to a target broke.
///
/// Cheaply cloneable, as it may be recorded for several requests
/// that were in flight on the same connection.
#[derive(Error, Debug, Clone)]
#[error("Connection broken, reason: {0}")]
pub struct BrokenConnectionError(Arc<BrokenConnectionErrorKind>);

impl BrokenConnectionError {
    /// Retrieves the reason of the broken connection.
    pub fn kind(&self) -> &BrokenConnectionErrorKind {
        &self.0
    }
}

impl From<BrokenConnectionErrorKind> for BrokenConnectionError {
    fn from(kind: BrokenConnectionErrorKind) -> Self {
        BrokenConnectionError(Arc::new(kind))
    }
}

/// A reason why a connection to a target got broken.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BrokenConnectionErrorKind {
    /// Could not establish a connection in time.
    #[error("Timed out while establishing a connection")]
    ConnectTimeout,

    /// Driver sent too many requests which were not answered in time.
    #[error("Too many orphaned stream ids: {0}")]
    TooManyOrphanedStreamIds(u16),

    /// Channel used to pass requests to the connection's router was closed.
    #[error("Failed to send/receive data needed to perform a request via tokio channel.")]
    ChannelError,

    /// Input/Output error has occurred.
    #[error("IO Error: {0}")]
    IoError(Arc<std::io::Error>),
}

/// An error returned to the caller once the execution of a request is finished.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ExecutionError {
    /// Load balancing policy returned an empty plan.
    #[error("Load balancing policy returned an empty plan")]
    EmptyPlan,

    /// The retry policy decided to give up; this is the error of the last attempt.
    #[error(transparent)]
    LastAttemptError(#[from] RequestAttemptError),

    /// The retry policy decided to give up after the last attempt
    /// did not receive any response within the client-side timeout.
    #[error("Request timeout: {0:?}")]
    RequestTimeout(Duration),

    /// Every target in the plan was tried and each of them failed.
    #[error("All targets in the plan failed: [{}]", format_target_errors(.0))]
    NoHostAvailable(Vec<(SocketAddr, RequestAttemptError)>),
}

impl ExecutionError {
    /// Returns per-target errors if this error was caused by exhausting the plan.
    pub fn target_errors(&self) -> &[(SocketAddr, RequestAttemptError)] {
        match self {
            ExecutionError::NoHostAvailable(errors) => errors,
            _ => &[],
        }
    }
}

fn format_target_errors(errors: &[(SocketAddr, RequestAttemptError)]) -> String {
    errors
        .iter()
        .map(|(addr, error)| format!("{addr}: {error}"))
        .join(", ")
}
