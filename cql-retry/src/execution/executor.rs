use std::future::Future;
use std::net::SocketAddr;

use tracing::{debug, trace, trace_span, Instrument};

use crate::client::execution_profile::ExecutionProfileHandle;
use crate::errors::{ExecutionError, RequestAttemptError};
use crate::frame::types::Consistency;
use crate::observability::driver_tracing::RequestSpan;
use crate::policies::retry::{ConfiguredRetryPolicy, RetryDecision};
use crate::statement::Statement;

/// A target (coordinator) to which an attempt of a request can be sent.
pub trait RequestTarget {
    /// Address identifying the target in errors and traces.
    fn address(&self) -> SocketAddr;
}

impl RequestTarget for SocketAddr {
    fn address(&self) -> SocketAddr {
        *self
    }
}

impl<T: RequestTarget + ?Sized> RequestTarget for &T {
    fn address(&self) -> SocketAddr {
        (**self).address()
    }
}

/// Successful outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunRequestResult<ResT> {
    /// One of the attempts succeeded with this response.
    Completed(ResT),
    /// The retry policy decided to ignore the failure of an attempt.
    /// The request should be treated as successful with no rows.
    Ignored,
}

impl<ResT> RunRequestResult<ResT> {
    /// Returns the response, or `None` if the failure was ignored.
    pub fn into_completed(self) -> Option<ResT> {
        match self {
            RunRequestResult::Completed(response) => Some(response),
            RunRequestResult::Ignored => None,
        }
    }
}

/// Executes requests over a plan of targets, applying the retry policy
/// after every failed attempt.
///
/// The executor performs no I/O itself: sending a single attempt is
/// delegated to the `run_request_once` closure passed to [`RequestExecutor::execute`].
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    default_execution_profile_handle: ExecutionProfileHandle,
}

impl RequestExecutor {
    /// Creates an executor using the given profile for statements
    /// which don't carry their own execution profile handle.
    pub fn new(default_execution_profile_handle: ExecutionProfileHandle) -> Self {
        Self {
            default_execution_profile_handle,
        }
    }

    /// The handle of the profile used for statements without their own one.
    pub fn get_default_execution_profile_handle(&self) -> &ExecutionProfileHandle {
        &self.default_execution_profile_handle
    }

    /// Executes `statement`, trying the targets of `plan` in order.
    ///
    /// `run_request_once` sends a single attempt to the given target with
    /// the given consistency. Each attempt is limited by the request timeout
    /// of the statement (or, if not set, of the execution profile); if it expires,
    /// the attempt fails with [`RequestAttemptError::ClientTimeout`].
    ///
    /// After every failed attempt the retry policy of the statement (or of
    /// the execution profile) decides what happens next. Once the profile's
    /// maximum number of retries has been made, any further retry decision
    /// is turned into a rethrow of the last error.
    pub async fn execute<T, ResT, QueryFut>(
        &self,
        statement: &Statement,
        plan: impl IntoIterator<Item = T>,
        run_request_once: impl Fn(&T, Consistency) -> QueryFut,
    ) -> Result<RunRequestResult<ResT>, ExecutionError>
    where
        T: RequestTarget,
        QueryFut: Future<Output = Result<ResT, RequestAttemptError>>,
    {
        let execution_profile = statement
            .get_execution_profile_handle()
            .unwrap_or(&self.default_execution_profile_handle)
            .access();

        let retry_policy = statement
            .get_retry_policy()
            .unwrap_or(&execution_profile.retry_policy);
        let consistency = statement
            .config
            .determine_consistency(execution_profile.consistency);
        let context = ExecuteRequestContext {
            statement,
            retry_policy,
            request_timeout: statement
                .config
                .request_timeout
                .or(execution_profile.request_timeout),
            max_retries: execution_profile.max_retries,
            request_span: RequestSpan::new_statement(&statement.contents, consistency),
        };

        let span = context.request_span.span().clone();
        let result = Self::run_request(&context, consistency, plan, run_request_once)
            .instrument(span)
            .await;

        match &result {
            Ok(RunRequestResult::Completed(_)) => {
                context.request_span.record_outcome("completed")
            }
            Ok(RunRequestResult::Ignored) => context.request_span.record_outcome("ignored"),
            Err(e) => context.request_span.record_error(e),
        }
        result
    }

    async fn run_request<T, ResT, QueryFut>(
        context: &ExecuteRequestContext<'_>,
        consistency: Consistency,
        plan: impl IntoIterator<Item = T>,
        run_request_once: impl Fn(&T, Consistency) -> QueryFut,
    ) -> Result<RunRequestResult<ResT>, ExecutionError>
    where
        T: RequestTarget,
        QueryFut: Future<Output = Result<ResT, RequestAttemptError>>,
    {
        let mut current_consistency = consistency;
        let mut retry_count: u32 = 0;
        let mut target_errors: Vec<(SocketAddr, RequestAttemptError)> = Vec::new();

        'nodes_in_plan: for target in plan {
            let address = target.address();
            let span = trace_span!("Executing request", node = %address);
            'same_node_retries: loop {
                trace!(
                    parent: &span,
                    consistency = %current_consistency,
                    retry_count,
                    "Execution started"
                );

                let attempt =
                    run_request_once(&target, current_consistency).instrument(span.clone());
                let request_result = match context.request_timeout {
                    Some(timeout) => tokio::time::timeout(timeout, attempt)
                        .await
                        .unwrap_or_else(|_: tokio::time::error::Elapsed| {
                            Err(RequestAttemptError::ClientTimeout(timeout))
                        }),
                    None => attempt.await,
                };

                let request_error = match request_result {
                    Ok(response) => {
                        trace!(parent: &span, "Request succeeded");
                        context.request_span.record_retries(retry_count);
                        return Ok(RunRequestResult::Completed(response));
                    }
                    Err(e) => {
                        trace!(
                            parent: &span,
                            last_error = %e,
                            "Request failed"
                        );
                        e
                    }
                };

                // Use retry policy to decide what to do next
                let retry_decision = context.retry_policy.decide(
                    context.statement,
                    current_consistency,
                    &request_error,
                    retry_count,
                );
                trace!(
                    parent: &span,
                    retry_decision = ?retry_decision
                );
                let retry_decision = match retry_decision {
                    RetryDecision::RetrySameTarget(_) | RetryDecision::RetryNextTarget(_)
                        if retry_count >= context.max_retries =>
                    {
                        debug!(
                            parent: &span,
                            retry_count,
                            max_retries = context.max_retries,
                            "Retry limit reached, rethrowing the last error"
                        );
                        RetryDecision::Rethrow
                    }
                    decision => decision,
                };

                match retry_decision {
                    RetryDecision::RetrySameTarget(new_cl) => {
                        retry_count += 1;
                        current_consistency = new_cl.unwrap_or(current_consistency);
                        continue 'same_node_retries;
                    }
                    RetryDecision::RetryNextTarget(new_cl) => {
                        retry_count += 1;
                        current_consistency = new_cl.unwrap_or(current_consistency);
                        target_errors.push((address, request_error));
                        continue 'nodes_in_plan;
                    }
                    RetryDecision::Ignore => {
                        context.request_span.record_retries(retry_count);
                        return Ok(RunRequestResult::Ignored);
                    }
                    RetryDecision::Rethrow => {
                        context.request_span.record_retries(retry_count);
                        return Err(match request_error {
                            RequestAttemptError::ClientTimeout(timeout) => {
                                ExecutionError::RequestTimeout(timeout)
                            }
                            other => ExecutionError::LastAttemptError(other),
                        });
                    }
                }
            }
        }

        context.request_span.record_retries(retry_count);
        if target_errors.is_empty() {
            Err(ExecutionError::EmptyPlan)
        } else {
            Err(ExecutionError::NoHostAvailable(target_errors))
        }
    }
}

struct ExecuteRequestContext<'a> {
    statement: &'a Statement,
    retry_policy: &'a ConfiguredRetryPolicy,
    request_timeout: Option<std::time::Duration>,
    max_retries: u32,
    request_span: RequestSpan,
}
