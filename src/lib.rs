//! Test doubles for SQL connection and transaction handles.
//!
//! Production code is written against the [`Connection`](domain::Connection)
//! and [`Transaction`](domain::Transaction) traits. Unit tests substitute
//! [`MockConnection`](mocks::MockConnection) and
//! [`MockTransaction`](mocks::MockTransaction), which record every call and
//! answer from expectations registered ahead of time.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                code under test               │
//! │        Arc<dyn Connection> / dyn Transaction │
//! ├──────────────────────────────────────────────┤
//! │       MockConnection  /  MockTransaction     │
//! │   flatten (sql, args...) into Vec<Value>     │
//! ├──────────────────────────────────────────────┤
//! │                   Recorder                   │
//! │  expectations · call log · assertions        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Two kinds of failure exist:
//!
//! - **Domain errors** are `DatabaseError` values a test registers; they come
//!   back through `Result` exactly as registered.
//! - **Setup errors** (a call nothing was registered for, a return value of
//!   the wrong shape) panic and fail the test.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sql_test_doubles::domain::{Connection, Rows, Value};
//! use sql_test_doubles::mocks::{Arg, MockConnection};
//!
//! # tokio_test::block_on(async {
//! let mock = MockConnection::new();
//! let rows = Rows::empty();
//! mock.expect_query("SELECT * FROM t", vec![Arg::from(1)])
//!     .once()
//!     .returns(Ok(rows.clone()));
//!
//! let conn: Arc<dyn Connection> = Arc::new(mock.clone());
//! let got = conn.query("SELECT * FROM t", &[Value::from(1)]).await.unwrap();
//!
//! assert!(got.same_as(&rows));
//! mock.assert_expectations();
//! # });
//! ```

pub mod config;
pub mod domain;
pub mod mocks;
pub mod observability;
