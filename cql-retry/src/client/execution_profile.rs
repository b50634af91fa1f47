//! `ExecutionProfile` is a grouping of configurable options regarding request execution.
//!
//! Profiles can be created to represent different workloads, which thanks to them
//! can be run conveniently by a single executor.
//!
//! There are two classes of objects related to execution profiles: `ExecutionProfile` and `ExecutionProfileHandle`.
//! The former is simply an immutable set of the settings. The latter is a handle that at particular moment points
//! to some `ExecutionProfile` (but during its lifetime, it can change the profile it points at).
//! Handles are assigned to `RequestExecutor`s and `Statement`s.
//!
//! ### Example
//! To create an `ExecutionProfile` and attach it to a `Statement`:
//! ```
//! use cql_retry::client::execution_profile::ExecutionProfile;
//! use cql_retry::statement::{Consistency, Statement};
//! use std::time::Duration;
//!
//! let profile = ExecutionProfile::builder()
//!     .consistency(Consistency::All)
//!     .request_timeout(Some(Duration::from_secs(30)))
//!     .build();
//!
//! let handle = profile.into_handle();
//!
//! let mut statement1 = Statement::from("SELECT * FROM ks.table");
//! statement1.set_execution_profile_handle(Some(handle.clone()));
//!
//! let mut statement2 = Statement::from("SELECT pk FROM ks.table WHERE pk = ?");
//! statement2.set_execution_profile_handle(Some(handle));
//! ```
//!
//! ### Example
//! To create an `ExecutionProfile` with config options defaulting
//! to those set on another profile:
//! ```
//! use cql_retry::client::execution_profile::ExecutionProfile;
//! use cql_retry::statement::Consistency;
//! use std::time::Duration;
//!
//! let base_profile = ExecutionProfile::builder()
//!     .request_timeout(Some(Duration::from_secs(30)))
//!     .build();
//!
//! let profile = base_profile.to_builder()
//!     .consistency(Consistency::All)
//!     .build();
//! ```
//!
//! `ExecutionProfileHandle`s can be remapped to another `ExecutionProfile`, and the change
//! affects all executors and statements that have been assigned that handle.
//! This enables quick workload switches.

use std::{fmt::Debug, sync::Arc, time::Duration};

use arc_swap::ArcSwap;

use crate::frame::types::Consistency;
use crate::policies::retry::{ConfiguredRetryPolicy, ExtendedRetryPolicy, RetryPolicy};
use crate::statement::DefaultIdempotence;

pub(crate) mod defaults {
    use crate::frame::types::Consistency;
    use crate::policies::retry::{
        ConfiguredRetryPolicy, DefaultRetryPolicy, IdempotenceAwareRetryPolicy,
    };
    use crate::statement::DefaultIdempotence;
    use std::sync::Arc;
    use std::time::Duration;

    pub(crate) fn consistency() -> Consistency {
        Consistency::LocalQuorum
    }
    pub(crate) fn request_timeout() -> Option<Duration> {
        Some(Duration::from_secs(30))
    }
    pub(crate) fn max_retries() -> u32 {
        10
    }
    pub(crate) fn retry_policy(default_idempotence: &DefaultIdempotence) -> ConfiguredRetryPolicy {
        ConfiguredRetryPolicy::Extended(Arc::new(IdempotenceAwareRetryPolicy::new(
            Arc::new(DefaultRetryPolicy::new()),
            default_idempotence.clone(),
        )))
    }
}

/// `ExecutionProfileBuilder` is used to create new `ExecutionProfile`s
/// # Example
///
/// ```
/// # use cql_retry::client::execution_profile::ExecutionProfile;
/// # use cql_retry::policies::retry::FallthroughRetryPolicy;
/// # use cql_retry::statement::Consistency;
/// # use std::sync::Arc;
/// let profile: ExecutionProfile = ExecutionProfile::builder()
///     .consistency(Consistency::Three) // as this is the number we shall count to
///     .retry_policy(Arc::new(FallthroughRetryPolicy::new()))
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct ExecutionProfileBuilder {
    request_timeout: Option<Option<Duration>>,
    consistency: Option<Consistency>,
    default_idempotence: Option<DefaultIdempotence>,
    retry_policy: Option<ConfiguredRetryPolicy>,
    max_retries: Option<u32>,
}

impl ExecutionProfileBuilder {
    /// Changes client-side timeout of a single attempt.
    /// The default is 30 seconds.
    ///
    /// # Example
    /// ```
    /// # use cql_retry::client::execution_profile::ExecutionProfile;
    /// # use std::time::Duration;
    /// let profile: ExecutionProfile = ExecutionProfile::builder()
    ///     .request_timeout(Some(Duration::from_secs(5)))
    ///     .build();
    /// ```
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Specify a default consistency to be used for statements.
    /// It's possible to override it by explicitly setting a consistency on the chosen statement.
    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Sets the idempotence assumed for statements that do not declare it.
    /// The default is `false`.
    ///
    /// The handle is shared with the default retry policy, so changing it
    /// later with [`DefaultIdempotence::set`] affects requests executed afterwards.
    pub fn default_idempotence(mut self, default_idempotence: DefaultIdempotence) -> Self {
        self.default_idempotence = Some(default_idempotence);
        self
    }

    /// Sets the [`ExtendedRetryPolicy`] to use by default on statements.
    /// The default is [DefaultRetryPolicy](crate::policies::retry::DefaultRetryPolicy)
    /// wrapped in [IdempotenceAwareRetryPolicy](crate::policies::retry::IdempotenceAwareRetryPolicy).
    /// It is possible to implement a custom retry policy by implementing the traits
    /// [`RetryPolicy`] and [`ExtendedRetryPolicy`].
    ///
    /// # Example
    /// ```
    /// # use cql_retry::client::execution_profile::ExecutionProfile;
    /// # use cql_retry::policies::retry::DefaultRetryPolicy;
    /// # use std::sync::Arc;
    /// let profile: ExecutionProfile = ExecutionProfile::builder()
    ///     .retry_policy(Arc::new(DefaultRetryPolicy::new()))
    ///     .build();
    /// ```
    pub fn retry_policy(mut self, retry_policy: Arc<dyn ExtendedRetryPolicy>) -> Self {
        self.retry_policy = Some(ConfiguredRetryPolicy::Extended(retry_policy));
        self
    }

    /// Sets a retry policy implementing only [`RetryPolicy`].
    ///
    /// Client timeouts, connection errors and unexpected errors are then
    /// handled by a fallback: one retry on the next target, then the error
    /// is returned.
    pub fn base_retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = Some(ConfiguredRetryPolicy::Base(retry_policy));
        self
    }

    /// Limits the number of retries of a single request, whatever the retry
    /// policy decides. Once reached, the last error is returned.
    /// The default is 10.
    ///
    /// # Example
    /// ```
    /// # use cql_retry::client::execution_profile::ExecutionProfile;
    /// let profile: ExecutionProfile = ExecutionProfile::builder()
    ///     .max_retries(3)
    ///     .build();
    /// ```
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Builds the ExecutionProfile after setting all the options.
    pub fn build(self) -> ExecutionProfile {
        let default_idempotence = self.default_idempotence.unwrap_or_default();
        let retry_policy_is_default = self.retry_policy.is_none();
        let retry_policy = self
            .retry_policy
            .unwrap_or_else(|| defaults::retry_policy(&default_idempotence));

        ExecutionProfile(Arc::new(ExecutionProfileInner {
            request_timeout: self
                .request_timeout
                .unwrap_or_else(defaults::request_timeout),
            consistency: self.consistency.unwrap_or_else(defaults::consistency),
            default_idempotence,
            retry_policy,
            retry_policy_is_default,
            max_retries: self.max_retries.unwrap_or_else(defaults::max_retries),
        }))
    }
}

impl Default for ExecutionProfileBuilder {
    fn default() -> Self {
        ExecutionProfile::builder()
    }
}

/// A profile that groups configurable options regarding request execution.
///
/// Execution profile is immutable as such, but the driver implements double indirection of form:
/// statement/executor -> ExecutionProfileHandle -> ExecutionProfile
/// which enables on-fly changing the actual profile associated with all entities (statement/executor)
/// by the same handle.
#[derive(Debug, Clone)]
pub struct ExecutionProfile(pub(crate) Arc<ExecutionProfileInner>);

#[derive(Debug)]
pub(crate) struct ExecutionProfileInner {
    pub(crate) request_timeout: Option<Duration>,

    pub(crate) consistency: Consistency,
    pub(crate) default_idempotence: DefaultIdempotence,

    pub(crate) retry_policy: ConfiguredRetryPolicy,
    // The default policy is bound to `default_idempotence` and is rebuilt
    // together with it rather than copied into derived builders.
    retry_policy_is_default: bool,
    pub(crate) max_retries: u32,
}

impl ExecutionProfileInner {
    /// Creates a builder having all options set to the same as set in this ExecutionProfileInner.
    pub(crate) fn to_builder(&self) -> ExecutionProfileBuilder {
        ExecutionProfileBuilder {
            request_timeout: Some(self.request_timeout),
            consistency: Some(self.consistency),
            default_idempotence: Some(self.default_idempotence.clone()),
            retry_policy: (!self.retry_policy_is_default).then(|| self.retry_policy.clone()),
            max_retries: Some(self.max_retries),
        }
    }
}

impl Default for ExecutionProfile {
    fn default() -> Self {
        ExecutionProfile::builder().build()
    }
}

impl ExecutionProfile {
    /// Creates a blank builder that can be used to construct new ExecutionProfile.
    pub fn builder() -> ExecutionProfileBuilder {
        ExecutionProfileBuilder {
            request_timeout: None,
            consistency: None,
            default_idempotence: None,
            retry_policy: None,
            max_retries: None,
        }
    }

    /// Creates a builder having all options set to the same as set in this ExecutionProfile.
    pub fn to_builder(&self) -> ExecutionProfileBuilder {
        self.0.to_builder()
    }

    /// Returns a new handle to this ExecutionProfile.
    pub fn into_handle(self) -> ExecutionProfileHandle {
        ExecutionProfileHandle(Arc::new((ArcSwap::new(self.0), None)))
    }

    /// Returns a new handle to this ExecutionProfile, tagging the handle with provided label.
    /// The tag, as its name suggests, is only useful for debugging purposes, while being confused
    /// about which statement/executor is assigned which handle. Identifying handles with tags
    /// could then help.
    pub fn into_handle_with_label(self, label: String) -> ExecutionProfileHandle {
        ExecutionProfileHandle(Arc::new((ArcSwap::new(self.0), Some(label))))
    }

    /// Gets client timeout associated with this profile.
    pub fn get_request_timeout(&self) -> Option<Duration> {
        self.0.request_timeout
    }

    /// Gets consistency associated with this profile.
    pub fn get_consistency(&self) -> Consistency {
        self.0.consistency
    }

    /// Gets the idempotence assumed for statements that do not declare it.
    pub fn get_default_idempotence(&self) -> &DefaultIdempotence {
        &self.0.default_idempotence
    }

    /// Gets retry policy associated with this profile.
    pub fn get_retry_policy(&self) -> &ConfiguredRetryPolicy {
        &self.0.retry_policy
    }

    /// Gets the maximum number of retries of a single request.
    pub fn get_max_retries(&self) -> u32 {
        self.0.max_retries
    }
}

/// A handle that points to an ExecutionProfile.
///
/// Its goal is to enable remapping all associated entities (statement/executor)
/// to another execution profile at once.
/// Note: Cloned handles initially point to the same Arc'ed execution profile.
/// However, as the mapping has yet another level of indirection - through
/// `Arc<ArcSwap>` - remapping one of them affects all the others, as under the hood
/// it is done by replacing the Arc held by the ArcSwap, which is shared
/// by all cloned handles.
/// The optional String is just for debug purposes. Its purpose is described
/// in [ExecutionProfile::into_handle_with_label].
#[derive(Debug, Clone)]
pub struct ExecutionProfileHandle(Arc<(ArcSwap<ExecutionProfileInner>, Option<String>)>);

impl ExecutionProfileHandle {
    pub(crate) fn access(&self) -> Arc<ExecutionProfileInner> {
        self.0 .0.load_full()
    }

    /// The label given in [ExecutionProfile::into_handle_with_label], if any.
    pub fn label(&self) -> Option<&str> {
        self.0 .1.as_deref()
    }

    /// Creates a builder having all options set to the same as set in the ExecutionProfile pointed by this handle.
    pub fn pointee_to_builder(&self) -> ExecutionProfileBuilder {
        self.0 .0.load().to_builder()
    }

    /// Returns execution profile pointed by this handle.
    pub fn to_profile(&self) -> ExecutionProfile {
        ExecutionProfile(self.access())
    }

    /// Makes the handle point to a new execution profile.
    /// All entities (statements/executors) holding this handle will reflect the change.
    pub fn map_to_another_profile(&mut self, profile: ExecutionProfile) {
        self.0 .0.store(profile.0)
    }
}
