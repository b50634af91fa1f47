use std::sync::Arc;

use tracing::info;

use super::{
    ClientTimeoutInfo, ConnectionErrorInfo, ExtendedRetryPolicy, ReadTimeoutInfo, RetryDecision,
    RetryPolicy, UnavailableInfo, UnexpectedErrorInfo, WriteTimeoutInfo,
};

/// A retry policy that wraps another policy, logging the decision made by its child policy.
///
/// Only decisions other than [`RetryDecision::Rethrow`] are logged, at the `info` level.
/// The child's decision is returned unchanged.
#[derive(Debug)]
pub struct LoggingRetryPolicy {
    child_policy: Arc<dyn ExtendedRetryPolicy>,
}

impl LoggingRetryPolicy {
    /// Creates a new instance of [LoggingRetryPolicy] wrapping `child_policy`.
    pub fn new(child_policy: Arc<dyn ExtendedRetryPolicy>) -> Self {
        Self { child_policy }
    }

    /// The wrapped policy.
    pub fn child_policy(&self) -> &Arc<dyn ExtendedRetryPolicy> {
        &self.child_policy
    }
}

fn should_log(decision: &RetryDecision) -> bool {
    !matches!(decision, RetryDecision::Rethrow)
}

impl RetryPolicy for LoggingRetryPolicy {
    fn on_read_timeout(&self, info: ReadTimeoutInfo<'_>) -> RetryDecision {
        let decision = self.child_policy.on_read_timeout(info);
        if should_log(&decision) {
            info!(
                consistency = %info.consistency,
                required = info.required_responses,
                received = info.received_responses,
                data_retrieved = info.data_retrieved,
                retry_count = info.retry_count,
                ?decision,
                "Read timeout handled by the retry policy"
            );
        }
        decision
    }

    fn on_write_timeout(&self, info: WriteTimeoutInfo<'_>) -> RetryDecision {
        let decision = self.child_policy.on_write_timeout(info);
        if should_log(&decision) {
            info!(
                consistency = %info.consistency,
                write_type = %info.write_type,
                required = info.required_acks,
                received = info.received_acks,
                retry_count = info.retry_count,
                ?decision,
                "Write timeout handled by the retry policy"
            );
        }
        decision
    }

    fn on_unavailable(&self, info: UnavailableInfo<'_>) -> RetryDecision {
        let decision = self.child_policy.on_unavailable(info);
        if should_log(&decision) {
            info!(
                consistency = %info.consistency,
                required = info.required_replicas,
                alive = info.alive_replicas,
                retry_count = info.retry_count,
                ?decision,
                "Unavailable error handled by the retry policy"
            );
        }
        decision
    }
}

impl ExtendedRetryPolicy for LoggingRetryPolicy {
    fn on_client_timeout(&self, info: ClientTimeoutInfo<'_>) -> RetryDecision {
        let decision = self.child_policy.on_client_timeout(info);
        if should_log(&decision) {
            info!(
                consistency = %info.consistency,
                retry_count = info.retry_count,
                ?decision,
                "Client timeout handled by the retry policy"
            );
        }
        decision
    }

    fn on_connection_error(&self, info: ConnectionErrorInfo<'_>) -> RetryDecision {
        let decision = self.child_policy.on_connection_error(info);
        if should_log(&decision) {
            info!(
                consistency = %info.consistency,
                error = %info.error,
                retry_count = info.retry_count,
                ?decision,
                "Connection error handled by the retry policy"
            );
        }
        decision
    }

    fn on_unexpected_error(&self, info: UnexpectedErrorInfo<'_>) -> RetryDecision {
        let decision = self.child_policy.on_unexpected_error(info);
        if should_log(&decision) {
            info!(
                consistency = %info.consistency,
                error = %info.error,
                retry_count = info.retry_count,
                ?decision,
                "Unexpected error handled by the retry policy"
            );
        }
        decision
    }
}
