//! Errors reported by the database in response to a request.
//!
//! [`DbError`] is shaped after the questions a retry policy asks about a
//! failed attempt:
//! * was a replica quorum not reached? Then the counters reported by the
//!   coordinator tell how far off it was;
//! * did the contacted coordinator itself fail? Then another one may succeed;
//! * was the request refused? Then sending it again changes nothing.

use std::fmt;

use crate::Consistency;
use thiserror::Error;

/// An error sent by the coordinator instead of a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// The coordinator knew in advance that too few replicas were alive,
    /// so the request was not even attempted.
    #[error(
        "Not enough replicas alive to achieve consistency {consistency} \
        (required: {required}, alive: {alive})"
    )]
    Unavailable {
        /// Consistency level of the attempt
        consistency: Consistency,
        /// Replicas that had to be alive
        required: i32,
        /// Replicas the coordinator considered alive
        alive: i32,
    },

    /// Replicas didn't answer a read in time.
    #[error(
        "Read timed out at consistency {consistency} \
        (received: {received} of {required}, data present: {data_present})"
    )]
    ReadTimeout {
        /// Consistency level of the attempt
        consistency: Consistency,
        /// Replicas that answered
        received: i32,
        /// Replicas that had to answer
        required: i32,
        /// Whether the replica asked for the actual data was among those that answered
        data_present: bool,
    },

    /// Replicas didn't acknowledge a write in time.
    #[error(
        "{write_type} write timed out at consistency {consistency} \
        (acknowledged: {received} of {required})"
    )]
    WriteTimeout {
        /// Consistency level of the attempt
        consistency: Consistency,
        /// Replicas that acknowledged the write
        received: i32,
        /// Replicas that had to acknowledge the write
        required: i32,
        /// Which step of the write timed out
        write_type: WriteType,
    },

    /// The coordinator is overloaded and refused to process the request.
    #[error("The coordinator is overloaded")]
    Overloaded,

    /// The coordinator is still joining the cluster.
    #[error("The coordinator is still bootstrapping")]
    IsBootstrapping,

    /// Truncation failed on the coordinator.
    #[error("Truncate failed on the coordinator")]
    TruncateError,

    /// Internal error of the coordinator.
    #[error("Internal server error")]
    ServerError,

    /// The request was refused. Retrying it, anywhere, gives the same answer.
    #[error("The request was rejected: {0}")]
    Rejected(RejectionReason),

    /// An error code this crate doesn't know about.
    #[error("Unknown server error (code: {0:#06x})")]
    Other(i32),
}

/// Why the server refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// The statement doesn't parse.
    Syntax,
    /// The statement parses, but is invalid.
    Invalid,
    /// The keyspace or table to create exists already.
    AlreadyExists,
    /// A user defined function failed.
    FunctionFailure,
    /// Bad credentials.
    Authentication,
    /// The user may not run the statement.
    Unauthorized,
    /// The statement conflicts with the server configuration.
    Config,
    /// A replica failed, rather than timed out, during a read.
    ReadFailure,
    /// A replica failed, rather than timed out, during a write.
    WriteFailure,
    /// The prepared statement is unknown to the coordinator.
    Unprepared,
    /// The driver sent a malformed message.
    Protocol,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RejectionReason::Syntax => "syntax error",
            RejectionReason::Invalid => "invalid statement",
            RejectionReason::AlreadyExists => "already exists",
            RejectionReason::FunctionFailure => "function failure",
            RejectionReason::Authentication => "authentication failed",
            RejectionReason::Unauthorized => "unauthorized",
            RejectionReason::Config => "configuration error",
            RejectionReason::ReadFailure => "read failure",
            RejectionReason::WriteFailure => "write failure",
            RejectionReason::Unprepared => "statement not prepared",
            RejectionReason::Protocol => "protocol error",
        };
        f.write_str(reason)
    }
}

/// The step of a write that timed out, as named by the server.
///
/// Whether a timed out write may be retried depends mostly on it:
/// a batch log write left nothing applied, while a simple write may
/// have been applied on some replicas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WriteType {
    /// Single-partition write, not a counter
    Simple,
    /// Logged batch, after its batch log had been written
    Batch,
    /// Unlogged batch
    UnloggedBatch,
    /// Counter update
    Counter,
    /// Write of the batch log of a logged batch
    BatchLog,
    /// Lightweight transaction
    Cas,
    /// Materialized view update
    View,
    /// Write to a table with change data capture, over its space limit
    Cdc,
    /// A name this crate doesn't know about
    Other(String),
}

impl WriteType {
    /// The name used for this write type in the native protocol.
    pub fn as_str(&self) -> &str {
        match self {
            WriteType::Simple => "SIMPLE",
            WriteType::Batch => "BATCH",
            WriteType::UnloggedBatch => "UNLOGGED_BATCH",
            WriteType::Counter => "COUNTER",
            WriteType::BatchLog => "BATCH_LOG",
            WriteType::Cas => "CAS",
            WriteType::View => "VIEW",
            WriteType::Cdc => "CDC",
            WriteType::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for WriteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for WriteType {
    fn from(name: &str) -> WriteType {
        match name {
            "SIMPLE" => WriteType::Simple,
            "BATCH" => WriteType::Batch,
            "UNLOGGED_BATCH" => WriteType::UnloggedBatch,
            "COUNTER" => WriteType::Counter,
            "BATCH_LOG" => WriteType::BatchLog,
            "CAS" => WriteType::Cas,
            "VIEW" => WriteType::View,
            "CDC" => WriteType::Cdc,
            _ => WriteType::Other(name.to_string()),
        }
    }
}
