use crate::errors::WriteType;

use super::{
    ClientTimeoutInfo, ConnectionErrorInfo, ExtendedRetryPolicy, ReadTimeoutInfo, RetryDecision,
    RetryPolicy, UnavailableInfo, UnexpectedErrorInfo, WriteTimeoutInfo,
};

/// Default retry policy - retries when there is a high chance that a retry might help.\
/// Behaviour based on [DataStax Java Driver](https://docs.datastax.com/en/drivers/java/3.11/com/datastax/driver/core/policies/DefaultRetryPolicy.html)
///
/// This policy does not look at idempotence of statements. It is wrapped in
/// [IdempotenceAwareRetryPolicy](super::IdempotenceAwareRetryPolicy) by default.
#[derive(Debug)]
pub struct DefaultRetryPolicy;

impl DefaultRetryPolicy {
    /// Creates a new instance of [DefaultRetryPolicy].
    pub fn new() -> DefaultRetryPolicy {
        DefaultRetryPolicy
    }
}

impl Default for DefaultRetryPolicy {
    fn default() -> DefaultRetryPolicy {
        DefaultRetryPolicy::new()
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    // ReadTimeout - coordinator didn't receive enough replies in time.
    // Retry at most once and only if there were actually enough replies
    // to satisfy consistency but they were all just checksums (data_retrieved == false).
    // This happens when the coordinator picked replicas that were overloaded/dying.
    // Retried request should have some useful response because the node will detect
    // that these replicas are dead.
    fn on_read_timeout(&self, info: ReadTimeoutInfo<'_>) -> RetryDecision {
        if info.retry_count == 0
            && info.received_responses >= info.required_responses
            && !info.data_retrieved
        {
            RetryDecision::RetrySameTarget(None)
        } else {
            RetryDecision::Rethrow
        }
    }

    // Write timeout - coordinator didn't receive enough replies in time.
    // Retry at most once and only for BatchLog write.
    // Coordinator probably didn't detect the nodes as dead.
    // By the time we retry they should be detected as dead.
    fn on_write_timeout(&self, info: WriteTimeoutInfo<'_>) -> RetryDecision {
        if info.retry_count == 0 && *info.write_type == WriteType::BatchLog {
            RetryDecision::RetrySameTarget(None)
        } else {
            RetryDecision::Rethrow
        }
    }

    // Unavailable - the current node believes that not enough nodes
    // are alive to satisfy specified consistency requirements.
    // Maybe this node has network problems - try a different one.
    // Perform at most one retry - it's unlikely that two nodes
    // have network problems at the same time
    fn on_unavailable(&self, info: UnavailableInfo<'_>) -> RetryDecision {
        if info.retry_count == 0 {
            RetryDecision::RetryNextTarget(None)
        } else {
            RetryDecision::Rethrow
        }
    }
}

// The remaining failures are problems of the contacted node,
// so try the next one. The plan bounds the number of such retries.
impl ExtendedRetryPolicy for DefaultRetryPolicy {
    fn on_client_timeout(&self, _info: ClientTimeoutInfo<'_>) -> RetryDecision {
        RetryDecision::RetryNextTarget(None)
    }

    fn on_connection_error(&self, _info: ConnectionErrorInfo<'_>) -> RetryDecision {
        RetryDecision::RetryNextTarget(None)
    }

    fn on_unexpected_error(&self, _info: UnexpectedErrorInfo<'_>) -> RetryDecision {
        RetryDecision::RetryNextTarget(None)
    }
}
