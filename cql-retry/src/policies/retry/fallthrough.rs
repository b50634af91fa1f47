use super::{
    ClientTimeoutInfo, ConnectionErrorInfo, ExtendedRetryPolicy, ReadTimeoutInfo, RetryDecision,
    RetryPolicy, UnavailableInfo, UnexpectedErrorInfo, WriteTimeoutInfo,
};

/// Forwards all errors directly to the user, never retries
#[derive(Debug)]
pub struct FallthroughRetryPolicy;

impl FallthroughRetryPolicy {
    /// Creates a new instance of [FallthroughRetryPolicy].
    pub fn new() -> FallthroughRetryPolicy {
        FallthroughRetryPolicy
    }
}

impl Default for FallthroughRetryPolicy {
    fn default() -> FallthroughRetryPolicy {
        FallthroughRetryPolicy
    }
}

impl RetryPolicy for FallthroughRetryPolicy {
    fn on_read_timeout(&self, _info: ReadTimeoutInfo<'_>) -> RetryDecision {
        RetryDecision::Rethrow
    }

    fn on_write_timeout(&self, _info: WriteTimeoutInfo<'_>) -> RetryDecision {
        RetryDecision::Rethrow
    }

    fn on_unavailable(&self, _info: UnavailableInfo<'_>) -> RetryDecision {
        RetryDecision::Rethrow
    }
}

impl ExtendedRetryPolicy for FallthroughRetryPolicy {
    fn on_client_timeout(&self, _info: ClientTimeoutInfo<'_>) -> RetryDecision {
        RetryDecision::Rethrow
    }

    fn on_connection_error(&self, _info: ConnectionErrorInfo<'_>) -> RetryDecision {
        RetryDecision::Rethrow
    }

    fn on_unexpected_error(&self, _info: UnexpectedErrorInfo<'_>) -> RetryDecision {
        RetryDecision::Rethrow
    }
}
