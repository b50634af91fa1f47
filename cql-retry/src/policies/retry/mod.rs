//! Retry policies: contracts, stock implementations and decorators.

mod default;
mod downgrading_consistency;
mod fallthrough;
mod idempotence_aware;
mod logging;
mod retry_policy;

pub use default::DefaultRetryPolicy;
pub use downgrading_consistency::DowngradingConsistencyRetryPolicy;
pub use fallthrough::FallthroughRetryPolicy;
pub use idempotence_aware::{
    IdempotenceAwareRetryPolicy, IdempotenceResolver, StatementIdempotence,
};
pub use logging::LoggingRetryPolicy;
pub use retry_policy::{
    ClientTimeoutInfo, ConfiguredRetryPolicy, ConnectionErrorInfo, ExtendedRetryPolicy,
    ReadTimeoutInfo, RetryDecision, RetryPolicy, UnavailableInfo, UnexpectedErrorInfo,
    WriteTimeoutInfo,
};
