//! Handle and value types returned by database operations.
//!
//! `Rows`, `Row` and `Statement` are opaque handles: clones share one
//! allocation, and equality is identity. A test can register a handle and
//! later check that the code under test received that exact handle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DatabaseError;
use super::value::Value;

/// Result set produced by a query.
#[derive(Clone)]
pub struct Rows(Arc<RowsInner>);

struct RowsInner {
    id: Uuid,
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

impl Rows {
    /// Creates a result set with a fresh identity.
    pub fn new(columns: Vec<String>, data: Vec<Vec<Value>>) -> Self {
        Self(Arc::new(RowsInner {
            id: Uuid::new_v4(),
            columns,
            data,
        }))
    }

    /// A result set with no columns and no rows.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Identity of this handle, shared by its clones.
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// Column names in select order.
    pub fn columns(&self) -> &[String] {
        &self.0.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.0.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.data.is_empty()
    }

    /// Iterates rows in order.
    pub fn iter(&self) -> impl Iterator<Item = &[Value]> {
        self.0.data.iter().map(Vec::as_slice)
    }

    /// Returns true when both handles refer to the same result set.
    pub fn same_as(&self, other: &Rows) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Rows {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows")
            .field("id", &self.0.id)
            .field("columns", &self.0.columns)
            .field("len", &self.0.data.len())
            .finish()
    }
}

/// Single row produced by `query_row`.
///
/// Errors are deferred to the point the row is read, so a `Row` can carry
/// a failure instead of values.
#[derive(Clone)]
pub struct Row(Arc<RowInner>);

struct RowInner {
    id: Uuid,
    values: Result<Vec<Value>, DatabaseError>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self::from_result(Ok(values))
    }

    /// A row whose read fails with `err`.
    pub fn error(err: DatabaseError) -> Self {
        Self::from_result(Err(err))
    }

    /// A row for a query that matched nothing.
    pub fn no_rows() -> Self {
        Self::error(DatabaseError::NotFound("no rows in result set".to_string()))
    }

    fn from_result(values: Result<Vec<Value>, DatabaseError>) -> Self {
        Self(Arc::new(RowInner {
            id: Uuid::new_v4(),
            values,
        }))
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// Reads all column values.
    pub fn values(&self) -> Result<&[Value], DatabaseError> {
        match &self.0.values {
            Ok(values) => Ok(values),
            Err(err) => Err(err.clone()),
        }
    }

    /// Reads the value at column `index`.
    pub fn get(&self, index: usize) -> Result<&Value, DatabaseError> {
        let values = self.values()?;
        values.get(index).ok_or_else(|| {
            DatabaseError::Other(format!(
                "column index {index} out of range for row with {} column(s)",
                values.len()
            ))
        })
    }

    pub fn same_as(&self, other: &Row) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("id", &self.0.id)
            .field("values", &self.0.values)
            .finish()
    }
}

/// Prepared statement handle.
#[derive(Clone)]
pub struct Statement(Arc<StatementInner>);

struct StatementInner {
    id: Uuid,
    sql: String,
}

impl Statement {
    /// Creates a statement handle with a fresh identity.
    pub fn new(sql: impl Into<String>) -> Self {
        Self(Arc::new(StatementInner {
            id: Uuid::new_v4(),
            sql: sql.into(),
        }))
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    /// The query text this statement was prepared from.
    pub fn sql(&self) -> &str {
        &self.0.sql
    }

    pub fn same_as(&self, other: &Statement) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Statement {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("id", &self.0.id)
            .field("sql", &self.0.sql)
            .finish()
    }
}

impl From<&Statement> for Value {
    fn from(stmt: &Statement) -> Self {
        Value::Handle(stmt.id())
    }
}

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }

    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Id generated by the statement, if the driver reports one.
    pub fn last_insert_id(&self) -> Result<i64, DatabaseError> {
        self.last_insert_id.ok_or_else(|| {
            DatabaseError::Other("last insert id is not supported by this driver".to_string())
        })
    }
}

/// Describes the driver behind a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub name: String,
    pub version: Option<String>,
}

impl DriverInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Snapshot of connection pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Maximum number of open connections, 0 for unlimited.
    pub max_open_connections: u32,
    pub open_connections: u32,
    pub in_use: u32,
    pub idle: u32,
    /// Total number of connections waited for.
    pub wait_count: u64,
    /// Total time blocked waiting for a new connection.
    pub wait_duration: Duration,
    pub max_idle_closed: u64,
    pub max_idle_time_closed: u64,
    pub max_lifetime_closed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_clone_shares_identity() {
        let rows = Rows::new(
            vec!["id".to_string()],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        );
        let cloned = rows.clone();

        assert!(rows.same_as(&cloned));
        assert_eq!(rows, cloned);
        assert_eq!(cloned.len(), 2);
        assert_eq!(cloned.columns(), ["id".to_string()]);
    }

    #[test]
    fn test_rows_with_same_content_are_distinct() {
        let a = Rows::empty();
        let b = Rows::empty();
        assert!(!a.same_as(&b));
        assert_ne!(a, b);
        assert!(a.is_empty());
    }

    #[test]
    fn test_rows_iter() {
        let rows = Rows::new(
            vec!["name".to_string()],
            vec![vec![Value::from("a")], vec![Value::from("b")]],
        );
        let names: Vec<&str> = rows.iter().filter_map(|r| r[0].as_text()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_row_values_and_get() {
        let row = Row::new(vec![Value::Int(7), Value::from("x")]);
        assert_eq!(row.values().unwrap().len(), 2);
        assert_eq!(row.get(0).unwrap(), &Value::Int(7));
        assert!(matches!(row.get(5), Err(DatabaseError::Other(_))));
    }

    #[test]
    fn test_row_deferred_error() {
        let row = Row::no_rows();
        assert!(matches!(row.values(), Err(DatabaseError::NotFound(_))));
        assert!(matches!(row.get(0), Err(DatabaseError::NotFound(_))));

        let row = Row::error(DatabaseError::ConnectionClosed);
        assert_eq!(row.values().unwrap_err(), DatabaseError::ConnectionClosed);
    }

    #[test]
    fn test_statement_as_value_is_identity() {
        let stmt = Statement::new("INSERT INTO t VALUES ($1)");
        let same = stmt.clone();
        let other = Statement::new("INSERT INTO t VALUES ($1)");

        assert_eq!(Value::from(&stmt), Value::from(&same));
        assert_ne!(Value::from(&stmt), Value::from(&other));
        assert_eq!(stmt.sql(), "INSERT INTO t VALUES ($1)");
    }

    #[test]
    fn test_exec_result_last_insert_id() {
        let result = ExecResult::new(3);
        assert_eq!(result.rows_affected(), 3);
        assert!(result.last_insert_id().is_err());

        let result = ExecResult::new(1).with_last_insert_id(42);
        assert_eq!(result.last_insert_id(), Ok(42));
    }

    #[test]
    fn test_driver_info_builder() {
        let driver = DriverInfo::new("postgres").with_version("16");
        assert_eq!(driver.name, "postgres");
        assert_eq!(driver.version.as_deref(), Some("16"));
    }

    #[test]
    fn test_pool_stats_serialize() {
        let stats = PoolStats {
            open_connections: 4,
            in_use: 1,
            idle: 3,
            ..PoolStats::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["open_connections"], 4);
        assert_eq!(json["idle"], 3);
    }
}
