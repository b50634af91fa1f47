use tracing::debug;

use super::{
    ClientTimeoutInfo, ConnectionErrorInfo, ExtendedRetryPolicy, ReadTimeoutInfo, RetryDecision,
    RetryPolicy, UnavailableInfo, UnexpectedErrorInfo, WriteTimeoutInfo,
};
use crate::errors::WriteType;
use crate::frame::types::Consistency;

/// Downgrading consistency retry policy - retries with lower consistency level if it knows\
/// that the initial CL is unreachable. Also, it behaves as [DefaultRetryPolicy](crate::policies::retry::DefaultRetryPolicy)
/// when it believes that the initial CL is reachable.
/// Behaviour based on [DataStax Java Driver]\
///(<https://docs.datastax.com/en/drivers/java/3.11/com/datastax/driver/core/policies/DowngradingConsistencyRetryPolicy.html>)
///
/// Like every stock policy it ignores idempotence; wrap it in
/// [IdempotenceAwareRetryPolicy](super::IdempotenceAwareRetryPolicy) to keep
/// non-idempotent writes from being replayed.
#[derive(Debug)]
pub struct DowngradingConsistencyRetryPolicy;

impl DowngradingConsistencyRetryPolicy {
    /// Creates a new instance of [DowngradingConsistencyRetryPolicy].
    pub fn new() -> DowngradingConsistencyRetryPolicy {
        DowngradingConsistencyRetryPolicy
    }
}

impl Default for DowngradingConsistencyRetryPolicy {
    fn default() -> DowngradingConsistencyRetryPolicy {
        DowngradingConsistencyRetryPolicy::new()
    }
}

fn max_likely_to_work_cl(known_ok: i32, previous_cl: Consistency) -> RetryDecision {
    let decision = if known_ok >= 3 {
        RetryDecision::RetrySameTarget(Some(Consistency::Three))
    } else if known_ok == 2 {
        RetryDecision::RetrySameTarget(Some(Consistency::Two))
    } else if known_ok == 1 || previous_cl == Consistency::EachQuorum {
        // JAVA-1005: EACH_QUORUM does not report a global number of alive replicas
        // so even if we get 0 alive replicas, there might be
        // a node up in some other datacenter
        RetryDecision::RetrySameTarget(Some(Consistency::One))
    } else {
        RetryDecision::Rethrow
    };
    if let RetryDecision::RetrySameTarget(new_cl) = decision {
        debug!(
            "Decided to lower required consistency from {} to {:?}.",
            previous_cl, new_cl
        );
    }
    decision
}

impl RetryPolicy for DowngradingConsistencyRetryPolicy {
    // ReadTimeout - coordinator didn't receive enough replies in time.
    fn on_read_timeout(&self, info: ReadTimeoutInfo<'_>) -> RetryDecision {
        if info.retry_count > 0 || info.consistency.is_serial() {
            RetryDecision::Rethrow
        } else if info.received_responses < info.required_responses {
            max_likely_to_work_cl(info.received_responses, info.consistency)
        } else if !info.data_retrieved {
            RetryDecision::RetrySameTarget(None)
        } else {
            RetryDecision::Rethrow
        }
    }

    // Write timeout - coordinator didn't receive enough replies in time.
    fn on_write_timeout(&self, info: WriteTimeoutInfo<'_>) -> RetryDecision {
        if info.retry_count > 0 {
            return RetryDecision::Rethrow;
        }

        match info.write_type {
            // At least one replica persisted the write, it will be propagated eventually.
            WriteType::Batch | WriteType::Simple if info.received_acks > 0 => RetryDecision::Ignore,
            WriteType::UnloggedBatch => {
                // Since only part of the batch could have been persisted,
                // retry with whatever consistency should allow to persist all
                max_likely_to_work_cl(info.received_acks, info.consistency)
            }
            WriteType::BatchLog => RetryDecision::RetrySameTarget(None),

            WriteType::Counter
            | WriteType::Cas
            | WriteType::View
            | WriteType::Cdc
            | WriteType::Simple
            | WriteType::Batch
            | WriteType::Other(_) => RetryDecision::Rethrow,
        }
    }

    // Unavailable - the current node believes that not enough nodes
    // are alive to satisfy specified consistency requirements.
    fn on_unavailable(&self, info: UnavailableInfo<'_>) -> RetryDecision {
        if info.retry_count > 0 {
            RetryDecision::Rethrow
        } else if info.consistency.is_serial() {
            // JAVA-764: if the requested consistency level is serial, it means that the operation failed at
            // the paxos phase of a LWT.
            // Retry on the next target, on the assumption that the initial coordinator could be network-isolated.
            RetryDecision::RetryNextTarget(None)
        } else {
            max_likely_to_work_cl(info.alive_replicas, info.consistency)
        }
    }
}

impl ExtendedRetryPolicy for DowngradingConsistencyRetryPolicy {
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
