//! Traits describing the database client surface.
//!
//! Production code takes `Arc<dyn Connection>` and never names a concrete
//! client, so tests can hand it a `MockConnection` instead.

use std::time::Duration;

use async_trait::async_trait;

use super::error::DatabaseError;
use super::types::{DriverInfo, ExecResult, PoolStats, Row, Rows, Statement};
use super::value::Value;

/// A pooled database connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Starts a transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>, DatabaseError>;

    /// Closes the pool, releasing every connection.
    async fn close(&self) -> Result<(), DatabaseError>;

    /// Describes the driver behind this connection.
    fn driver(&self) -> DriverInfo;

    /// Runs a query returning rows.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError>;

    /// Runs a query expected to return at most one row.
    async fn query_row(&self, sql: &str, args: &[Value]) -> Row;

    /// Runs a statement that returns no rows.
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError>;

    /// Verifies the connection is still alive.
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Prepares a statement for later execution.
    async fn prepare(&self, sql: &str) -> Result<Statement, DatabaseError>;

    /// Sets the maximum amount of time a connection may be reused.
    fn set_conn_max_lifetime(&self, lifetime: Duration);

    /// Sets the maximum number of idle connections kept in the pool.
    fn set_max_idle_conns(&self, count: i64);

    /// Sets the maximum number of open connections, 0 for unlimited.
    fn set_max_open_conns(&self, count: i64);

    /// Returns pool statistics.
    fn stats(&self) -> PoolStats;
}

/// An open transaction.
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn commit(&self) -> Result<(), DatabaseError>;

    async fn rollback(&self) -> Result<(), DatabaseError>;

    /// Prepares a statement scoped to this transaction.
    async fn prepare(&self, sql: &str) -> Result<Statement, DatabaseError>;

    /// Returns a transaction-specific handle for an already prepared statement.
    fn stmt(&self, statement: &Statement) -> Statement;

    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError>;

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError>;

    async fn query_row(&self, sql: &str, args: &[Value]) -> Row;
}
