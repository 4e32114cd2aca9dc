//! Test doubles for the `Connection` and `Transaction` traits.
//!
//! Both doubles delegate every call to a shared [`Recorder`], so a test
//! registers expectations on the double, hands a clone to the code under
//! test, and asserts on the recorded calls afterwards.

pub mod connection;
pub mod expectation;
pub mod recorder;
pub mod transaction;

pub use connection::{CONNECTION_METHODS, MockConnection};
pub use expectation::{
    AnyShape, Arg, DriverShape, ErrorShape, ExecShape, Expect, PreparedShape, ReturnKind,
    ReturnShape, Returns, RowShape, RowsShape, StatementShape, StatsShape, Times,
    TransactionShape, UnitShape,
};
pub use recorder::{CallRecord, MethodTable, Recorder};
pub use transaction::{MockTransaction, TRANSACTION_METHODS};

/// Matchers for a query-style call: the text matcher first, then one per
/// bound argument.
pub(crate) fn query_matchers(sql: impl Into<Arg>, args: Vec<Arg>) -> Vec<Arg> {
    let mut matchers = Vec::with_capacity(args.len() + 1);
    matchers.push(sql.into());
    matchers.extend(args);
    matchers
}
