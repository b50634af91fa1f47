//! Defines the [`Statement`] type, which represents a CQL statement to be executed.

use super::StatementConfig;
use crate::client::execution_profile::ExecutionProfileHandle;
use crate::frame::types::Consistency;
use crate::policies::retry::ConfiguredRetryPolicy;
use std::time::Duration;

/// CQL statement, together with the options that influence its execution.
///
/// The retry machinery only ever reads a statement; it is owned by the caller.
#[derive(Debug, Clone)]
pub struct Statement {
    pub(crate) config: StatementConfig,

    /// The CQL statement text.
    pub contents: String,
}

impl Statement {
    /// Creates a new [`Statement`] from a CQL statement string.
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            contents: query_text.into(),
            config: Default::default(),
        }
    }

    /// Sets the consistency to be used when executing this statement.
    pub fn set_consistency(&mut self, c: Consistency) {
        self.config.consistency = Some(c);
    }

    /// Unsets the consistency overridden on this statement.
    /// This means that consistency will be derived from the execution profile
    /// (per-statement or, if absent, the default one).
    pub fn unset_consistency(&mut self) {
        self.config.consistency = None;
    }

    /// Gets the consistency to be used when executing this statement if it is filled.
    /// If this is empty, the consistency of the execution profile will be used.
    pub fn get_consistency(&self) -> Option<Consistency> {
        self.config.consistency
    }

    /// Sets the idempotence of this statement.
    /// A statement is idempotent if it can be applied multiple times without changing the result of the initial application.
    /// Retry policies may replay writes only for idempotent statements.
    pub fn set_is_idempotent(&mut self, is_idempotent: bool) {
        self.config.is_idempotent = Some(is_idempotent);
    }

    /// Forgets the idempotence declared on this statement,
    /// so that the configured default idempotence applies.
    pub fn unset_is_idempotent(&mut self) {
        self.config.is_idempotent = None;
    }

    /// Gets the idempotence declared on this statement.
    /// `None` means that it was never declared.
    pub fn get_is_idempotent(&self) -> Option<bool> {
        self.config.is_idempotent
    }

    /// Sets the client-side timeout for a single attempt of this statement.
    /// If not None, the driver will stop waiting for the response after this
    /// time and will consult the retry policy about a client timeout.
    pub fn set_request_timeout(&mut self, timeout: Option<Duration>) {
        self.config.request_timeout = timeout
    }

    /// Gets client timeout associated with this statement.
    pub fn get_request_timeout(&self) -> Option<Duration> {
        self.config.request_timeout
    }

    /// Set the retry policy for this statement, overriding the one from execution profile.
    #[inline]
    pub fn set_retry_policy(&mut self, retry_policy: Option<ConfiguredRetryPolicy>) {
        self.config.retry_policy = retry_policy;
    }

    /// Get the retry policy set for the statement.
    #[inline]
    pub fn get_retry_policy(&self) -> Option<&ConfiguredRetryPolicy> {
        self.config.retry_policy.as_ref()
    }

    /// Associates the statement with a new execution profile.
    pub fn set_execution_profile_handle(&mut self, profile_handle: Option<ExecutionProfileHandle>) {
        self.config.execution_profile_handle = profile_handle;
    }

    /// Borrows the execution profile handle associated with this statement.
    pub fn get_execution_profile_handle(&self) -> Option<&ExecutionProfileHandle> {
        self.config.execution_profile_handle.as_ref()
    }
}

impl From<String> for Statement {
    fn from(s: String) -> Statement {
        Statement::new(s)
    }
}

impl<'a> From<&'a str> for Statement {
    fn from(s: &'a str) -> Statement {
        Statement::new(s.to_owned())
    }
}
