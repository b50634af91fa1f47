use std::sync::Arc;

use tracing::trace;

use super::{
    ClientTimeoutInfo, ConnectionErrorInfo, ExtendedRetryPolicy, ReadTimeoutInfo, RetryDecision,
    RetryPolicy, UnavailableInfo, UnexpectedErrorInfo, WriteTimeoutInfo,
};
use crate::statement::{DefaultIdempotence, Statement};

/// Decides whether a statement may be safely executed more than once.
///
/// The provided implementation uses the flag declared on the statement and,
/// if the statement does not declare one, the configured default.
/// Implement this trait and override [`IdempotenceResolver::is_idempotent`]
/// when you know more about your statements, e.g. that all `SELECT`s
/// are idempotent.
pub trait IdempotenceResolver: std::fmt::Debug + Send + Sync {
    /// Returns `true` if replaying `statement` can't apply its effects twice.
    fn is_idempotent(&self, statement: &Statement, default_idempotence: bool) -> bool {
        statement.get_is_idempotent().unwrap_or(default_idempotence)
    }
}

/// Resolves idempotence from the statement's flag, falling back to the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementIdempotence;

impl IdempotenceResolver for StatementIdempotence {}

/// A retry policy that avoids retrying non-idempotent statements.
///
/// Every decision is delegated to the wrapped policy, except that after a
/// write timeout, a client timeout or an unexpected error the statement is
/// first checked for idempotence. In these cases the write may already have
/// been applied by the coordinator or some replicas, so for a non-idempotent
/// statement the decision is [`RetryDecision::Rethrow`], no matter what the
/// wrapped policy would say.
///
/// Read timeouts, unavailability and connection errors are delegated
/// unconditionally. The first two tell nothing about a write being applied,
/// and a request whose connection broke before a response never produced a
/// result on the coordinator that a retry could duplicate.
///
/// # Example
/// ```
/// # use cql_retry::policies::retry::{DefaultRetryPolicy, IdempotenceAwareRetryPolicy};
/// # use cql_retry::statement::DefaultIdempotence;
/// # use std::sync::Arc;
/// let default_idempotence = DefaultIdempotence::new(false);
/// let policy = IdempotenceAwareRetryPolicy::new(
///     Arc::new(DefaultRetryPolicy::new()),
///     default_idempotence.clone(),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct IdempotenceAwareRetryPolicy {
    child_policy: Arc<dyn ExtendedRetryPolicy>,
    default_idempotence: DefaultIdempotence,
    resolver: Arc<dyn IdempotenceResolver>,
}

impl IdempotenceAwareRetryPolicy {
    /// Creates a new [IdempotenceAwareRetryPolicy] wrapping `child_policy`.
    ///
    /// `default_idempotence` is consulted for statements which do not declare
    /// their idempotence. It is read on every decision, so changes made through
    /// other clones of the handle take effect immediately.
    pub fn new(
        child_policy: Arc<dyn ExtendedRetryPolicy>,
        default_idempotence: DefaultIdempotence,
    ) -> Self {
        Self {
            child_policy,
            default_idempotence,
            resolver: Arc::new(StatementIdempotence),
        }
    }

    /// Replaces the way idempotence of statements is determined.
    pub fn with_resolver(mut self, resolver: Arc<dyn IdempotenceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Determines whether the given statement is idempotent.
    pub fn is_idempotent(&self, statement: &Statement) -> bool {
        self.resolver
            .is_idempotent(statement, self.default_idempotence.get())
    }

    /// The wrapped policy.
    pub fn child_policy(&self) -> &Arc<dyn ExtendedRetryPolicy> {
        &self.child_policy
    }

    fn if_idempotent(
        &self,
        statement: &Statement,
        decide: impl FnOnce(&dyn ExtendedRetryPolicy) -> RetryDecision,
    ) -> RetryDecision {
        if self.is_idempotent(statement) {
            decide(self.child_policy.as_ref())
        } else {
            trace!("Statement is not idempotent, not retrying");
            RetryDecision::Rethrow
        }
    }
}

impl RetryPolicy for IdempotenceAwareRetryPolicy {
    fn on_read_timeout(&self, info: ReadTimeoutInfo<'_>) -> RetryDecision {
        self.child_policy.on_read_timeout(info)
    }

    fn on_write_timeout(&self, info: WriteTimeoutInfo<'_>) -> RetryDecision {
        self.if_idempotent(info.statement, |child| child.on_write_timeout(info))
    }

    fn on_unavailable(&self, info: UnavailableInfo<'_>) -> RetryDecision {
        self.child_policy.on_unavailable(info)
    }
}

impl ExtendedRetryPolicy for IdempotenceAwareRetryPolicy {
    fn on_client_timeout(&self, info: ClientTimeoutInfo<'_>) -> RetryDecision {
        self.if_idempotent(info.statement, |child| child.on_client_timeout(info))
    }

    fn on_connection_error(&self, info: ConnectionErrorInfo<'_>) -> RetryDecision {
        self.child_policy.on_connection_error(info)
    }

    fn on_unexpected_error(&self, info: UnexpectedErrorInfo<'_>) -> RetryDecision {
        self.if_idempotent(info.statement, |child| child.on_unexpected_error(info))
    }
}
