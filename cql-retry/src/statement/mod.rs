//! Statements and their per-request configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::client::execution_profile::ExecutionProfileHandle;
use crate::policies::retry::ConfiguredRetryPolicy;

pub mod unprepared;

pub use cql_proto::frame::types::{Consistency, SerialConsistency};
pub use unprepared::Statement;

#[derive(Debug, Clone, Default)]
pub(crate) struct StatementConfig {
    pub(crate) consistency: Option<Consistency>,

    /// `None` means that idempotence was not declared and
    /// the configured default has to be used.
    pub(crate) is_idempotent: Option<bool>,

    pub(crate) request_timeout: Option<Duration>,

    pub(crate) execution_profile_handle: Option<ExecutionProfileHandle>,
    pub(crate) retry_policy: Option<ConfiguredRetryPolicy>,
}

impl StatementConfig {
    /// Determines the consistency of a query
    #[must_use]
    pub(crate) fn determine_consistency(&self, default_consistency: Consistency) -> Consistency {
        self.consistency.unwrap_or(default_consistency)
    }
}

/// Idempotence assumed for statements which do not declare it themselves.
///
/// This is a handle: clones share the same flag, so the default can be
/// changed while the session is running and every policy holding a clone
/// observes the new value on its next decision.
#[derive(Debug, Clone, Default)]
pub struct DefaultIdempotence(Arc<AtomicBool>);

impl DefaultIdempotence {
    /// Creates a new handle with the given initial value.
    pub fn new(is_idempotent: bool) -> Self {
        Self(Arc::new(AtomicBool::new(is_idempotent)))
    }

    /// Reads the current default.
    #[inline]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Changes the default for all clones of this handle.
    pub fn set(&self, is_idempotent: bool) {
        self.0.store(is_idempotent, Ordering::Release);
    }
}
