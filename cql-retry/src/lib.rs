//! Retry decision core of a CQL driver.
//!
//! After an attempt of a request fails, the driver has to decide whether to
//! try again on the same target, try the next target of the plan, treat the
//! failure as a success with no rows, or give up. This crate contains:
//! * the [retry policy contracts](crate::policies::retry) and the stock policies,
//! * [IdempotenceAwareRetryPolicy](crate::policies::retry::IdempotenceAwareRetryPolicy),
//!   which keeps non-idempotent statements from being replayed when a write
//!   may already have been applied,
//! * [execution profiles](crate::client::execution_profile), grouping the
//!   options that influence execution,
//! * [RequestExecutor](crate::execution::RequestExecutor), the attempt loop
//!   applying retry decisions over a plan of targets.
//!
//! # Example
//! ```rust
//! # use cql_retry::errors::{ExecutionError, RequestAttemptError};
//! # async fn check_only_compiles() -> Result<(), ExecutionError> {
//! use cql_retry::client::execution_profile::ExecutionProfile;
//! use cql_retry::execution::RequestExecutor;
//! use cql_retry::statement::{Consistency, DefaultIdempotence, Statement};
//! use std::net::SocketAddr;
//!
//! let default_idempotence = DefaultIdempotence::new(false);
//! let profile = ExecutionProfile::builder()
//!     .consistency(Consistency::Quorum)
//!     .default_idempotence(default_idempotence.clone())
//!     .build();
//! let executor = RequestExecutor::new(profile.into_handle());
//!
//! let mut statement = Statement::new("UPDATE ks.t SET v = 1 WHERE pk = 0");
//! statement.set_is_idempotent(true);
//!
//! let plan: Vec<SocketAddr> = vec!["127.0.0.1:9042".parse().unwrap()];
//! let _result = executor
//!     .execute(&statement, plan, |_target, _consistency| async {
//!         // Send the request to the target here.
//!         Ok::<_, RequestAttemptError>(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod frame {
    //! Protocol types used in retry decisions.
    pub mod types {
        //! Consistency levels.
        pub use cql_proto::frame::types::{Consistency, SerialConsistency};
    }
}

pub mod client;
pub mod errors;
pub mod execution;
pub(crate) mod observability;
pub mod policies;
pub mod statement;
pub(crate) mod utils;

#[cfg(test)]
pub(crate) use utils::test_utils;

pub use client::execution_profile::{ExecutionProfile, ExecutionProfileHandle};
pub use execution::{RequestExecutor, RunRequestResult};
pub use statement::Statement;
