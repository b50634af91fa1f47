use crate::utils::{execute, read_timeout, setup_tracing, write_timeout, FakeCluster, Reaction};
use assert_matches::assert_matches;
use cql_retry::errors::{
    BrokenConnectionErrorKind, DbError, ExecutionError, RequestAttemptError, WriteType,
};
use cql_retry::policies::retry::{DefaultRetryPolicy, IdempotenceAwareRetryPolicy, IdempotenceResolver};
use cql_retry::statement::{Consistency, DefaultIdempotence, Statement};
use cql_retry::{ExecutionProfile, RequestExecutor, RunRequestResult};
use std::sync::Arc;

#[tokio::test]
#[ntest::timeout(10000)]
async fn default_idempotence_can_be_changed_at_runtime() {
    setup_tracing();
    let default_idempotence = DefaultIdempotence::new(false);
    // The default profile wraps the default policy in the idempotence check.
    let executor = RequestExecutor::new(
        ExecutionProfile::builder()
            .default_idempotence(default_idempotence.clone())
            .build()
            .into_handle(),
    );
    let statement = Statement::new("BEGIN BATCH INSERT INTO ks.t (pk) VALUES (0) APPLY BATCH");
    let cluster = FakeCluster::new(2);

    cluster
        .node(0)
        .script([Reaction::Fail(write_timeout(WriteType::BatchLog, 1))]);
    let result = execute(&executor, &statement, &cluster).await;
    assert_matches!(
        result,
        Err(ExecutionError::LastAttemptError(RequestAttemptError::DbError(
            DbError::WriteTimeout { .. },
            _
        )))
    );
    assert_eq!(cluster.queries(), vec![1, 0]);

    default_idempotence.set(true);
    cluster
        .node(0)
        .script([Reaction::Fail(write_timeout(WriteType::BatchLog, 1))]);
    let result = execute(&executor, &statement, &cluster).await.unwrap();
    assert_eq!(result, RunRequestResult::Completed(Consistency::LocalQuorum));
    // One more attempt for the rejected request, two for the retried one.
    assert_eq!(cluster.queries(), vec![3, 0]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn declared_idempotence_wins_over_default() {
    setup_tracing();
    let executor = RequestExecutor::new(
        ExecutionProfile::builder()
            .default_idempotence(DefaultIdempotence::new(true))
            .build()
            .into_handle(),
    );
    let cluster = FakeCluster::new(2);
    cluster
        .node(0)
        .script([Reaction::Fail(write_timeout(WriteType::BatchLog, 1))]);

    let mut statement = Statement::new("UPDATE ks.t SET v = v + 1 WHERE pk = 0");
    statement.set_is_idempotent(false);

    let result = execute(&executor, &statement, &cluster).await;
    assert_matches!(result, Err(ExecutionError::LastAttemptError(_)));
    assert_eq!(cluster.queries(), vec![1, 0]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn read_timeout_is_retried_for_non_idempotent_statement() {
    setup_tracing();
    let executor = RequestExecutor::new(ExecutionProfile::default().into_handle());
    let cluster = FakeCluster::new(2);
    // Enough replicas responded, but none of them with data.
    cluster
        .node(0)
        .script([Reaction::Fail(read_timeout(2, false))]);

    let mut statement = Statement::new("SELECT * FROM ks.t WHERE pk = 0");
    statement.set_is_idempotent(false);

    let result = execute(&executor, &statement, &cluster).await.unwrap();
    assert_eq!(result, RunRequestResult::Completed(Consistency::LocalQuorum));
    assert_eq!(cluster.queries(), vec![2, 0]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn connection_error_is_retried_for_non_idempotent_statement() {
    setup_tracing();
    let executor = RequestExecutor::new(ExecutionProfile::default().into_handle());
    let cluster = FakeCluster::new(2);
    cluster
        .node(0)
        .script([Reaction::Fail(RequestAttemptError::BrokenConnectionError(
            BrokenConnectionErrorKind::ConnectTimeout.into(),
        ))]);

    let mut statement = Statement::new("INSERT INTO ks.t (pk, v) VALUES (0, 0)");
    statement.set_is_idempotent(false);

    let result = execute(&executor, &statement, &cluster).await.unwrap();
    assert_eq!(result, RunRequestResult::Completed(Consistency::LocalQuorum));
    assert_eq!(cluster.queries(), vec![1, 1]);
}

#[derive(Debug)]
struct SelectsAreIdempotent;

impl IdempotenceResolver for SelectsAreIdempotent {
    fn is_idempotent(&self, statement: &Statement, default_idempotence: bool) -> bool {
        statement.get_is_idempotent().unwrap_or_else(|| {
            statement
                .contents
                .trim_start()
                .to_ascii_uppercase()
                .starts_with("SELECT")
                || default_idempotence
        })
    }
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn custom_resolver_is_used_by_executor() {
    setup_tracing();
    let default_idempotence = DefaultIdempotence::new(false);
    let policy = IdempotenceAwareRetryPolicy::new(
        Arc::new(DefaultRetryPolicy::new()),
        default_idempotence.clone(),
    )
    .with_resolver(Arc::new(SelectsAreIdempotent));
    let executor = RequestExecutor::new(
        ExecutionProfile::builder()
            .default_idempotence(default_idempotence)
            .retry_policy(Arc::new(policy))
            .build()
            .into_handle(),
    );

    let cluster = FakeCluster::new(2);
    cluster.node(0).script([Reaction::Fail(RequestAttemptError::DbError(
        DbError::ServerError,
        String::new(),
    ))]);
    let select = Statement::new("select * from ks.t where pk = 0");
    let result = execute(&executor, &select, &cluster).await.unwrap();
    assert_eq!(result, RunRequestResult::Completed(Consistency::LocalQuorum));
    assert_eq!(cluster.queries(), vec![1, 1]);

    cluster.node(0).script([Reaction::Fail(RequestAttemptError::DbError(
        DbError::ServerError,
        String::new(),
    ))]);
    let insert = Statement::new("INSERT INTO ks.t (pk, v) VALUES (0, 0)");
    let result = execute(&executor, &insert, &cluster).await;
    assert_matches!(result, Err(ExecutionError::LastAttemptError(_)));
    assert_eq!(cluster.queries(), vec![2, 1]);
}
