//! Transaction double.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RecorderConfig;
use crate::domain::{
    DatabaseError, ExecResult, Row, Rows, Statement, Transaction, Value, flatten_args,
};

use super::expectation::{
    Arg, ErrorShape, ExecShape, Expect, PreparedShape, ReturnKind, RowShape, RowsShape,
    StatementShape,
};
use super::query_matchers;
use super::recorder::{CallRecord, MethodTable, Recorder};

/// Methods a [`MockTransaction`] answers, with their return shapes.
pub const TRANSACTION_METHODS: MethodTable = &[
    ("commit", ReturnKind::Error),
    ("rollback", ReturnKind::Error),
    ("prepare", ReturnKind::Prepared),
    ("stmt", ReturnKind::Statement),
    ("exec", ReturnKind::Exec),
    ("query", ReturnKind::Rows),
    ("query_row", ReturnKind::Row),
];

/// Mock open transaction.
///
/// There is no open/finished state: `commit` twice simply records two
/// calls, each answered by whatever was registered.
#[derive(Debug, Clone)]
pub struct MockTransaction {
    recorder: Arc<Recorder>,
}

impl MockTransaction {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RecorderConfig::default().with_label("transaction"))
    }

    #[must_use]
    pub fn with_config(config: RecorderConfig) -> Self {
        Self {
            recorder: Arc::new(Recorder::with_methods(config, TRANSACTION_METHODS)),
        }
    }

    /// The recorder behind this double, for the generic API.
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Expects a `commit` call.
    pub fn expect_commit(&self) -> Expect<'_, ErrorShape> {
        self.recorder.expect_as("commit", Vec::new())
    }

    /// Expects a `rollback` call.
    pub fn expect_rollback(&self) -> Expect<'_, ErrorShape> {
        self.recorder.expect_as("rollback", Vec::new())
    }

    /// Expects `prepare` with query text matching `sql`.
    pub fn expect_prepare(&self, sql: impl Into<Arg>) -> Expect<'_, PreparedShape> {
        self.recorder.expect_as("prepare", vec![sql.into()])
    }

    /// Expects `stmt` to be called with `statement`, matched by identity.
    pub fn expect_stmt(&self, statement: impl Into<Arg>) -> Expect<'_, StatementShape> {
        self.recorder.expect_as("stmt", vec![statement.into()])
    }

    /// Expects `exec` with the text matcher followed by one matcher per bound argument.
    pub fn expect_exec(&self, sql: impl Into<Arg>, args: Vec<Arg>) -> Expect<'_, ExecShape> {
        self.recorder.expect_as("exec", query_matchers(sql, args))
    }

    /// Expects `query`, matched like [`expect_exec`](Self::expect_exec).
    pub fn expect_query(&self, sql: impl Into<Arg>, args: Vec<Arg>) -> Expect<'_, RowsShape> {
        self.recorder.expect_as("query", query_matchers(sql, args))
    }

    /// Expects `query_row`, matched like [`expect_exec`](Self::expect_exec).
    pub fn expect_query_row(&self, sql: impl Into<Arg>, args: Vec<Arg>) -> Expect<'_, RowShape> {
        self.recorder.expect_as("query_row", query_matchers(sql, args))
    }

    /// # Panics
    /// Panics unless `method` was called exactly `times` times with `args`.
    pub fn assert_called(&self, method: &str, args: &[Value], times: usize) {
        self.recorder.assert_called(method, args, times);
    }

    /// # Panics
    /// Panics if any expectation was not called the configured number of times.
    pub fn assert_expectations(&self) {
        self.recorder.assert_expectations();
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.recorder.calls()
    }
}

impl Default for MockTransaction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn commit(&self) -> Result<(), DatabaseError> {
        self.recorder.call::<ErrorShape>("commit", Vec::new())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        self.recorder.call::<ErrorShape>("rollback", Vec::new())
    }

    async fn prepare(&self, sql: &str) -> Result<Statement, DatabaseError> {
        self.recorder.call::<PreparedShape>("prepare", vec![Value::from(sql)])
    }

    fn stmt(&self, statement: &Statement) -> Statement {
        self.recorder.call::<StatementShape>("stmt", vec![Value::from(statement)])
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.recorder.call::<ExecShape>("exec", flatten_args(sql, args))
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
        self.recorder.call::<RowsShape>("query", flatten_args(sql, args))
    }

    async fn query_row(&self, sql: &str, args: &[Value]) -> Row {
        self.recorder.call::<RowShape>("query_row", flatten_args(sql, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_and_rollback() {
        let tx = MockTransaction::new();
        tx.expect_commit().once().returns_ok();
        tx.expect_rollback().once().returns(Err(DatabaseError::TxDone));

        assert_eq!(tx.commit().await, Ok(()));
        assert_eq!(tx.rollback().await, Err(DatabaseError::TxDone));
        tx.assert_expectations();
    }

    #[tokio::test]
    async fn test_operations_callable_after_commit() {
        let tx = MockTransaction::new();
        tx.expect_commit().returns_ok();
        tx.expect_exec("UPDATE t SET x = 1", vec![]).returns(Ok(ExecResult::new(4)));

        tx.commit().await.unwrap();
        let result = tx.exec("UPDATE t SET x = 1", &[]).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(result.rows_affected(), 4);
        tx.assert_called("commit", &[], 2);
    }

    #[tokio::test]
    async fn test_exec_matches_flattened_arguments() {
        let tx = MockTransaction::new();
        tx.expect_exec("SELECT 1", vec![Arg::from(42)])
            .returns(Ok(ExecResult::new(0).with_last_insert_id(9)));

        let result = tx.exec("SELECT 1", &[Value::from(42)]).await.unwrap();
        assert_eq!(result.last_insert_id(), Ok(9));
        tx.assert_called("exec", &[Value::from("SELECT 1"), Value::Int(42)], 1);
    }

    #[tokio::test]
    #[should_panic(expected = "transaction: unexpected call exec(\"SELECT 1\", 43)")]
    async fn test_exec_with_other_arguments_panics() {
        let tx = MockTransaction::new();
        tx.expect_exec("SELECT 1", vec![Arg::from(42)]).returns(Ok(ExecResult::new(0)));

        let _ = tx.exec("SELECT 1", &[Value::from(43)]).await;
    }

    #[test]
    fn test_stmt_matches_statement_identity() {
        let tx = MockTransaction::new();
        let prepared = Statement::new("INSERT INTO t VALUES ($1)");
        let bound = Statement::new("INSERT INTO t VALUES ($1)");
        tx.expect_stmt(&prepared).returns(bound.clone());

        let got = tx.stmt(&prepared);
        assert!(got.same_as(&bound));
    }

    #[test]
    #[should_panic(expected = "transaction: unexpected call stmt(")]
    fn test_stmt_with_other_statement_panics() {
        let tx = MockTransaction::new();
        let prepared = Statement::new("SELECT 1");
        tx.expect_stmt(&prepared).returns(prepared.clone());

        let _ = tx.stmt(&Statement::new("SELECT 1"));
    }

    #[tokio::test]
    async fn test_prepare_query_and_query_row() {
        let tx = MockTransaction::new();
        let stmt = Statement::new("SELECT * FROM t WHERE id = $1");
        let rows = Rows::empty();
        let row = Row::no_rows();
        tx.expect_prepare(Arg::any()).returns(Ok(stmt.clone()));
        tx.expect_query("SELECT * FROM t", vec![]).returns(Ok(rows.clone()));
        tx.expect_query_row("SELECT * FROM t WHERE id = $1", vec![Arg::from(1)])
            .returns(row.clone());

        assert_eq!(tx.prepare("SELECT * FROM t WHERE id = $1").await, Ok(stmt));
        assert!(tx.query("SELECT * FROM t", &[]).await.unwrap().same_as(&rows));
        let got = tx
            .query_row("SELECT * FROM t WHERE id = $1", &[Value::from(1)])
            .await;
        assert!(got.same_as(&row));
        assert_eq!(tx.calls().len(), 3);
    }
}
