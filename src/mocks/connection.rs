//! Connection double.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::RecorderConfig;
use crate::domain::{
    Connection, DatabaseError, DriverInfo, ExecResult, PoolStats, Row, Rows, Statement,
    Transaction, Value, flatten_args,
};

use super::expectation::{
    Arg, DriverShape, ErrorShape, ExecShape, Expect, PreparedShape, ReturnKind, RowShape,
    RowsShape, StatsShape, TransactionShape, UnitShape,
};
use super::query_matchers;
use super::recorder::{CallRecord, MethodTable, Recorder};

/// Methods a [`MockConnection`] answers, with their return shapes.
pub const CONNECTION_METHODS: MethodTable = &[
    ("begin", ReturnKind::Transaction),
    ("close", ReturnKind::Error),
    ("driver", ReturnKind::Driver),
    ("query", ReturnKind::Rows),
    ("query_row", ReturnKind::Row),
    ("exec", ReturnKind::Exec),
    ("ping", ReturnKind::Error),
    ("prepare", ReturnKind::Prepared),
    ("set_conn_max_lifetime", ReturnKind::Unit),
    ("set_max_idle_conns", ReturnKind::Unit),
    ("set_max_open_conns", ReturnKind::Unit),
    ("stats", ReturnKind::Stats),
];

/// Mock database connection.
///
/// Clones share one recorder: keep one clone in the test for setup and
/// assertions and pass another to the code under test.
///
/// # Example
///
/// ```
/// use sql_test_doubles::domain::{Connection, DatabaseError};
/// use sql_test_doubles::mocks::MockConnection;
///
/// # tokio_test::block_on(async {
/// let conn = MockConnection::new();
/// conn.expect_ping()
///     .once()
///     .returns(Err(DatabaseError::Connection("refused".to_string())));
///
/// assert!(conn.ping().await.is_err());
/// conn.assert_expectations();
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockConnection {
    recorder: Arc<Recorder>,
}

impl MockConnection {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RecorderConfig::default().with_label("connection"))
    }

    #[must_use]
    pub fn with_config(config: RecorderConfig) -> Self {
        Self {
            recorder: Arc::new(Recorder::with_methods(config, CONNECTION_METHODS)),
        }
    }

    /// The recorder behind this double, for the generic API.
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Expects a `begin` call.
    pub fn expect_begin(&self) -> Expect<'_, TransactionShape> {
        self.recorder.expect_as("begin", Vec::new())
    }

    /// Expects a `close` call.
    pub fn expect_close(&self) -> Expect<'_, ErrorShape> {
        self.recorder.expect_as("close", Vec::new())
    }

    /// Expects a `driver` call.
    pub fn expect_driver(&self) -> Expect<'_, DriverShape> {
        self.recorder.expect_as("driver", Vec::new())
    }

    /// Expects `query` with the text matcher followed by one matcher per bound argument.
    pub fn expect_query(&self, sql: impl Into<Arg>, args: Vec<Arg>) -> Expect<'_, RowsShape> {
        self.recorder.expect_as("query", query_matchers(sql, args))
    }

    /// Expects `query_row`, matched like [`expect_query`](Self::expect_query).
    pub fn expect_query_row(&self, sql: impl Into<Arg>, args: Vec<Arg>) -> Expect<'_, RowShape> {
        self.recorder.expect_as("query_row", query_matchers(sql, args))
    }

    /// Expects `exec`, matched like [`expect_query`](Self::expect_query).
    pub fn expect_exec(&self, sql: impl Into<Arg>, args: Vec<Arg>) -> Expect<'_, ExecShape> {
        self.recorder.expect_as("exec", query_matchers(sql, args))
    }

    /// Expects a `ping` call.
    pub fn expect_ping(&self) -> Expect<'_, ErrorShape> {
        self.recorder.expect_as("ping", Vec::new())
    }

    /// Expects `prepare` with query text matching `sql`.
    pub fn expect_prepare(&self, sql: impl Into<Arg>) -> Expect<'_, PreparedShape> {
        self.recorder.expect_as("prepare", vec![sql.into()])
    }

    /// Expects `set_conn_max_lifetime` with a matching duration.
    pub fn expect_set_conn_max_lifetime(&self, lifetime: impl Into<Arg>) -> Expect<'_, UnitShape> {
        self.recorder.expect_as("set_conn_max_lifetime", vec![lifetime.into()])
    }

    /// Expects `set_max_idle_conns` with a matching count.
    pub fn expect_set_max_idle_conns(&self, count: impl Into<Arg>) -> Expect<'_, UnitShape> {
        self.recorder.expect_as("set_max_idle_conns", vec![count.into()])
    }

    /// Expects `set_max_open_conns` with a matching count.
    pub fn expect_set_max_open_conns(&self, count: impl Into<Arg>) -> Expect<'_, UnitShape> {
        self.recorder.expect_as("set_max_open_conns", vec![count.into()])
    }

    /// Expects a `stats` call.
    pub fn expect_stats(&self) -> Expect<'_, StatsShape> {
        self.recorder.expect_as("stats", Vec::new())
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

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DatabaseError> {
        let tx = self.recorder.call::<TransactionShape>("begin", Vec::new())?;
        Ok(Box::new(tx))
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.recorder.call::<ErrorShape>("close", Vec::new())
    }

    fn driver(&self) -> DriverInfo {
        self.recorder.call::<DriverShape>("driver", Vec::new())
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
        self.recorder.call::<RowsShape>("query", flatten_args(sql, args))
    }

    async fn query_row(&self, sql: &str, args: &[Value]) -> Row {
        self.recorder.call::<RowShape>("query_row", flatten_args(sql, args))
    }

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.recorder.call::<ExecShape>("exec", flatten_args(sql, args))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.recorder.call::<ErrorShape>("ping", Vec::new())
    }

    async fn prepare(&self, sql: &str) -> Result<Statement, DatabaseError> {
        self.recorder.call::<PreparedShape>("prepare", vec![Value::from(sql)])
    }

    fn set_conn_max_lifetime(&self, lifetime: Duration) {
        self.recorder.call::<UnitShape>("set_conn_max_lifetime", vec![Value::from(lifetime)]);
    }

    fn set_max_idle_conns(&self, count: i64) {
        self.recorder.call::<UnitShape>("set_max_idle_conns", vec![Value::from(count)]);
    }

    fn set_max_open_conns(&self, count: i64) {
        self.recorder.call::<UnitShape>("set_max_open_conns", vec![Value::from(count)]);
    }

    fn stats(&self) -> PoolStats {
        self.recorder.call::<StatsShape>("stats", Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTransaction;

    #[tokio::test]
    async fn test_close_returns_ok() {
        let conn = MockConnection::new();
        conn.expect_close().returns_ok();

        assert_eq!(conn.close().await, Ok(()));
    }

    #[tokio::test]
    async fn test_query_returns_registered_rows() {
        let conn = MockConnection::new();
        let rows = Rows::new(vec!["id".to_string()], vec![vec![Value::Int(1)]]);
        conn.expect_query("SELECT * FROM t", vec![Arg::from(1)]).returns(Ok(rows.clone()));

        let got = conn.query("SELECT * FROM t", &[Value::from(1)]).await.unwrap();
        assert!(got.same_as(&rows));
    }

    #[tokio::test]
    async fn test_begin_error() {
        let conn = MockConnection::new();
        conn.expect_begin().returns(Err(DatabaseError::ConnectionClosed));

        let result = conn.begin().await;
        assert_eq!(result.err(), Some(DatabaseError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_begin_hands_out_registered_transaction() {
        let conn = MockConnection::new();
        let tx = MockTransaction::new();
        tx.expect_commit().once().returns_ok();
        conn.expect_begin().once().returns(Ok(tx.clone()));

        let handle = conn.begin().await.unwrap();
        handle.commit().await.unwrap();

        tx.assert_expectations();
        conn.assert_expectations();
    }

    #[tokio::test]
    #[should_panic(expected = "connection: unexpected call ping()")]
    async fn test_unregistered_ping_panics() {
        let conn = MockConnection::new();
        let _ = conn.ping().await;
    }

    #[tokio::test]
    async fn test_query_row_and_exec() {
        let conn = MockConnection::new();
        let row = Row::new(vec![Value::from("alice")]);
        conn.expect_query_row("SELECT name FROM users WHERE id = $1", vec![Arg::from(7)])
            .returns(row.clone());
        conn.expect_exec("DELETE FROM users WHERE id = $1", vec![Arg::any()])
            .returns(Ok(ExecResult::new(1)));

        let got = conn
            .query_row("SELECT name FROM users WHERE id = $1", &[Value::from(7)])
            .await;
        assert!(got.same_as(&row));

        let result = conn
            .exec("DELETE FROM users WHERE id = $1", &[Value::from(99)])
            .await
            .unwrap();
        assert_eq!(result.rows_affected(), 1);
    }

    #[tokio::test]
    async fn test_prepare() {
        let conn = MockConnection::new();
        let stmt = Statement::new("SELECT 1");
        conn.expect_prepare("SELECT 1").returns(Ok(stmt.clone()));

        assert_eq!(conn.prepare("SELECT 1").await, Ok(stmt));
    }

    #[test]
    fn test_configuration_calls_are_recorded() {
        let conn = MockConnection::new();
        conn.expect_set_max_idle_conns(5).record();
        conn.expect_set_max_open_conns(Arg::any()).record();
        conn.expect_set_conn_max_lifetime(Duration::from_secs(60)).record();

        conn.set_max_idle_conns(5);
        conn.set_max_open_conns(20);
        conn.set_conn_max_lifetime(Duration::from_secs(60));

        conn.assert_called("set_max_idle_conns", &[Value::Int(5)], 1);
        conn.assert_called("set_max_open_conns", &[Value::Int(20)], 1);
        conn.assert_called(
            "set_conn_max_lifetime",
            &[Value::Duration(Duration::from_secs(60))],
            1,
        );
        assert_eq!(conn.calls().len(), 3);
    }

    #[test]
    fn test_driver_and_stats() {
        let conn = MockConnection::new();
        conn.expect_driver().returns(DriverInfo::new("postgres"));
        conn.expect_stats().returns(PoolStats {
            open_connections: 3,
            ..PoolStats::default()
        });

        assert_eq!(conn.driver().name, "postgres");
        assert_eq!(conn.stats().open_connections, 3);
    }

    #[test]
    fn test_clones_share_recorder() {
        let conn = MockConnection::new();
        let handle = conn.clone();
        conn.expect_stats().returns(PoolStats::default());

        let _ = handle.stats();
        assert_eq!(conn.recorder().number_of_calls("stats"), 1);
    }

    #[test]
    fn test_custom_label() {
        let conn = MockConnection::with_config(RecorderConfig::default().with_label("orders"));
        assert_eq!(conn.recorder().label(), "orders");
    }
}
