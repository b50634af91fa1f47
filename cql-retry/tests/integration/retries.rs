use crate::utils::{
    execute, overloaded, setup_tracing, unavailable, write_timeout, Category, FakeCluster,
    Reaction, ScriptedPolicy,
};
use assert_matches::assert_matches;
use cql_retry::errors::{
    BrokenConnectionErrorKind, DbError, ExecutionError, RequestAttemptError, WriteType,
};
use cql_retry::policies::retry::{
    DefaultRetryPolicy, DowngradingConsistencyRetryPolicy, FallthroughRetryPolicy,
    IdempotenceAwareRetryPolicy, LoggingRetryPolicy, RetryDecision,
};
use cql_retry::statement::{Consistency, DefaultIdempotence, Statement};
use cql_retry::{ExecutionProfile, RequestExecutor, RunRequestResult};
use std::sync::Arc;
use std::time::Duration;

fn executor_with(profile: ExecutionProfile) -> RequestExecutor {
    RequestExecutor::new(profile.into_handle())
}

fn idempotence_aware(
    inner: Arc<ScriptedPolicy>,
    default_idempotence: &DefaultIdempotence,
) -> ExecutionProfile {
    ExecutionProfile::builder()
        .consistency(Consistency::Quorum)
        .request_timeout(Some(Duration::from_millis(500)))
        .default_idempotence(default_idempotence.clone())
        .retry_policy(Arc::new(IdempotenceAwareRetryPolicy::new(
            inner,
            default_idempotence.clone(),
        )))
        .build()
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn non_idempotent_write_timeout_is_not_retried() {
    setup_tracing();
    let cluster = FakeCluster::new(3);
    cluster
        .node(0)
        .script([Reaction::Fail(write_timeout(WriteType::Simple, 1))]);

    let inner = Arc::new(ScriptedPolicy::new(|_, _| {
        RetryDecision::RetrySameTarget(Some(Consistency::Quorum))
    }));
    let executor = executor_with(idempotence_aware(
        inner.clone(),
        &DefaultIdempotence::new(false),
    ));

    let mut statement = Statement::new("INSERT INTO ks.t (pk, v) VALUES (0, 0)");
    statement.set_is_idempotent(false);

    let result = execute(&executor, &statement, &cluster).await;
    assert_matches!(
        result,
        Err(ExecutionError::LastAttemptError(RequestAttemptError::DbError(
            DbError::WriteTimeout { .. },
            _
        )))
    );
    assert_eq!(cluster.queries(), vec![1, 0, 0]);
    assert!(inner.calls().is_empty());
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10000)]
async fn client_timeout_of_implicitly_idempotent_statement_moves_to_next_node() {
    setup_tracing();
    let cluster = FakeCluster::new(3);
    cluster.node(0).script([Reaction::Hang]);

    let inner = Arc::new(ScriptedPolicy::new(|_, _| {
        RetryDecision::RetryNextTarget(Some(Consistency::One))
    }));
    let executor = executor_with(idempotence_aware(
        inner.clone(),
        &DefaultIdempotence::new(true),
    ));

    let statement = Statement::new("UPDATE ks.t SET v = 1 WHERE pk = 0");
    assert_eq!(statement.get_is_idempotent(), None);

    let result = execute(&executor, &statement, &cluster).await.unwrap();
    assert_eq!(result, RunRequestResult::Completed(Consistency::One));
    assert_eq!(cluster.queries(), vec![1, 1, 0]);
    assert_eq!(inner.calls(), vec![(Category::ClientTimeout, 0)]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn unavailable_decisions_are_forwarded_for_non_idempotent_statement() {
    setup_tracing();
    let cluster = FakeCluster::new(3);
    cluster.node(0).script([
        Reaction::Fail(unavailable(3, 1)),
        Reaction::Fail(unavailable(3, 1)),
    ]);

    let inner = Arc::new(ScriptedPolicy::new(|category, retry_count| {
        match (category, retry_count) {
            (Category::Unavailable, 0) => RetryDecision::RetrySameTarget(None),
            _ => RetryDecision::Rethrow,
        }
    }));
    let executor = executor_with(idempotence_aware(
        inner.clone(),
        &DefaultIdempotence::new(false),
    ));

    let mut statement = Statement::new("INSERT INTO ks.t (pk, v) VALUES (0, 0)");
    statement.set_is_idempotent(false);

    let result = execute(&executor, &statement, &cluster).await;
    assert_matches!(
        result,
        Err(ExecutionError::LastAttemptError(RequestAttemptError::DbError(
            DbError::Unavailable {
                required: 3,
                alive: 1,
                ..
            },
            _
        )))
    );
    assert_eq!(cluster.queries(), vec![2, 0, 0]);
    assert_eq!(
        cluster.node(0).consistencies(),
        vec![Consistency::Quorum, Consistency::Quorum]
    );
    assert_eq!(
        inner.calls(),
        vec![(Category::Unavailable, 0), (Category::Unavailable, 1)]
    );
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn unexpected_error_of_idempotent_statement_is_forwarded() {
    setup_tracing();
    let cluster = FakeCluster::new(3);
    cluster.node(0).script([Reaction::Fail(overloaded())]);

    let inner = Arc::new(ScriptedPolicy::new(|_, _| {
        RetryDecision::RetryNextTarget(Some(Consistency::LocalQuorum))
    }));
    let executor = executor_with(idempotence_aware(
        inner.clone(),
        &DefaultIdempotence::new(false),
    ));

    let mut statement = Statement::new("INSERT INTO ks.t (pk, v) VALUES (0, 0)");
    statement.set_is_idempotent(true);

    let result = execute(&executor, &statement, &cluster).await.unwrap();
    assert_eq!(result, RunRequestResult::Completed(Consistency::LocalQuorum));
    assert_eq!(cluster.queries(), vec![1, 1, 0]);
    assert_eq!(inner.calls(), vec![(Category::UnexpectedError, 0)]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn ignored_write_timeout_finishes_request() {
    setup_tracing();
    let cluster = FakeCluster::new(2);
    cluster
        .node(0)
        .script([Reaction::Fail(write_timeout(WriteType::Simple, 1))]);

    let default_idempotence = DefaultIdempotence::new(false);
    let executor = executor_with(
        ExecutionProfile::builder()
            .retry_policy(Arc::new(IdempotenceAwareRetryPolicy::new(
                Arc::new(DowngradingConsistencyRetryPolicy::new()),
                default_idempotence,
            )))
            .build(),
    );

    let mut statement = Statement::new("INSERT INTO ks.t (pk, v) VALUES (0, 0)");
    statement.set_is_idempotent(true);

    let result = execute(&executor, &statement, &cluster).await.unwrap();
    assert_eq!(result, RunRequestResult::Ignored);
    assert_eq!(cluster.queries(), vec![1, 0]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn downgraded_consistency_is_used_for_the_retry() {
    setup_tracing();
    let cluster = FakeCluster::new(2);
    cluster.node(0).script([Reaction::Fail(unavailable(3, 2))]);

    let executor = executor_with(
        ExecutionProfile::builder()
            .consistency(Consistency::Quorum)
            .retry_policy(Arc::new(LoggingRetryPolicy::new(Arc::new(
                DowngradingConsistencyRetryPolicy::new(),
            ))))
            .build(),
    );
    let statement = Statement::new("SELECT * FROM ks.t WHERE pk = 0");

    let result = execute(&executor, &statement, &cluster).await.unwrap();
    assert_eq!(result, RunRequestResult::Completed(Consistency::Two));
    assert_eq!(
        cluster.node(0).consistencies(),
        vec![Consistency::Quorum, Consistency::Two]
    );
    assert_eq!(cluster.queries(), vec![2, 0]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn base_policy_gets_one_next_target_retry_for_connection_errors() {
    setup_tracing();
    let cluster = FakeCluster::new(3);
    let broken = || {
        Reaction::Fail(RequestAttemptError::BrokenConnectionError(
            BrokenConnectionErrorKind::ChannelError.into(),
        ))
    };
    cluster.node(0).script([broken()]);
    cluster.node(1).script([broken()]);

    let base = Arc::new(ScriptedPolicy::new(|_, _| RetryDecision::Ignore));
    let executor = executor_with(
        ExecutionProfile::builder()
            .base_retry_policy(base.clone())
            .build(),
    );
    let statement = Statement::new("SELECT * FROM ks.t WHERE pk = 0");

    let result = execute(&executor, &statement, &cluster).await;
    assert_matches!(
        result,
        Err(ExecutionError::LastAttemptError(
            RequestAttemptError::BrokenConnectionError(_)
        ))
    );
    assert_eq!(cluster.queries(), vec![1, 1, 0]);
    // The fallback never asks a base policy about extended categories.
    assert!(base.calls().is_empty());
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn exhausted_plan_reports_every_node() {
    setup_tracing();
    let cluster = FakeCluster::new(3);
    for idx in 0..3 {
        cluster.node(idx).script([Reaction::Fail(overloaded())]);
    }

    let executor = executor_with(
        ExecutionProfile::builder()
            .retry_policy(Arc::new(DefaultRetryPolicy::new()))
            .build(),
    );
    let statement = Statement::new("SELECT * FROM ks.t WHERE pk = 0");

    let error = execute(&executor, &statement, &cluster).await.unwrap_err();
    let addresses: Vec<_> = error
        .target_errors()
        .iter()
        .map(|(address, _)| address.to_string())
        .collect();
    assert_eq!(
        addresses,
        vec!["127.0.0.1:9042", "127.0.0.2:9042", "127.0.0.3:9042"]
    );
    assert_eq!(cluster.queries(), vec![1, 1, 1]);
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(10000)]
async fn rethrown_client_timeout_becomes_request_timeout() {
    setup_tracing();
    let cluster = FakeCluster::new(2);
    cluster.node(0).script([Reaction::Hang]);

    let timeout = Duration::from_millis(200);
    let executor = executor_with(
        ExecutionProfile::builder()
            .retry_policy(Arc::new(FallthroughRetryPolicy::new()))
            .build(),
    );
    let mut statement = Statement::new("SELECT * FROM ks.t WHERE pk = 0");
    statement.set_request_timeout(Some(timeout));

    let result = execute(&executor, &statement, &cluster).await;
    assert_matches!(result, Err(ExecutionError::RequestTimeout(t)) if t == timeout);
    assert_eq!(cluster.queries(), vec![1, 0]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn same_target_retries_stop_at_max_retries() {
    setup_tracing();
    let cluster = FakeCluster::new(2);
    cluster
        .node(0)
        .script((0..10).map(|_| Reaction::Fail(unavailable(3, 1))));

    let inner = Arc::new(ScriptedPolicy::new(|_, _| {
        RetryDecision::RetrySameTarget(None)
    }));
    let executor = executor_with(
        ExecutionProfile::builder()
            .base_retry_policy(inner.clone())
            .max_retries(3)
            .build(),
    );
    let statement = Statement::new("SELECT * FROM ks.t WHERE pk = 0");

    let result = execute(&executor, &statement, &cluster).await;
    assert_matches!(
        result,
        Err(ExecutionError::LastAttemptError(RequestAttemptError::DbError(
            DbError::Unavailable { .. },
            _
        )))
    );
    assert_eq!(cluster.queries(), vec![4, 0]);
    assert_eq!(
        inner.calls(),
        vec![
            (Category::Unavailable, 0),
            (Category::Unavailable, 1),
            (Category::Unavailable, 2),
            (Category::Unavailable, 3),
        ]
    );
}
