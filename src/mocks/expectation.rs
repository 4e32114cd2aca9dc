//! Expectations: argument matchers, call counts and registered return values.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::value::display_list;
use crate::domain::{
    DatabaseError, DriverInfo, ExecResult, PoolStats, Row, Rows, Statement, Value,
};

use super::recorder::Recorder;
use super::transaction::MockTransaction;

/// Callback run each time an expectation matches, with the flattened arguments.
pub type RunFn = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Matcher for one argument position.
#[derive(Clone)]
pub enum Arg {
    /// Matches a structurally equal value.
    Eq(Value),
    /// Matches anything.
    Any,
    /// Matches any value of the given kind, e.g. `"int"` or `"text"`.
    Kind(&'static str),
    /// Matches values accepted by a predicate.
    Predicate {
        description: String,
        predicate: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    },
}

impl Arg {
    #[must_use]
    pub fn any() -> Self {
        Arg::Any
    }

    #[must_use]
    pub fn any_of_kind(kind: &'static str) -> Self {
        Arg::Kind(kind)
    }

    pub fn matched_by(
        description: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Arg::Predicate {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Arg::Eq(expected) => expected == value,
            Arg::Any => true,
            Arg::Kind(kind) => value.kind() == *kind,
            Arg::Predicate { predicate, .. } => predicate(value),
        }
    }

    /// Exact matchers for a list of values.
    pub fn exact(values: impl IntoIterator<Item = Value>) -> Vec<Arg> {
        values.into_iter().map(Arg::Eq).collect()
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Eq(value) => write!(f, "{value}"),
            Arg::Any => f.write_str("_"),
            Arg::Kind(kind) => write!(f, "<{kind}>"),
            Arg::Predicate { description, .. } => write!(f, "matched_by({description})"),
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arg({self})")
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Eq(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Eq(value.into())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Eq(value.into())
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Eq(value.into())
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Eq(value.into())
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Eq(value.into())
    }
}

impl From<Duration> for Arg {
    fn from(value: Duration) -> Self {
        Arg::Eq(value.into())
    }
}

impl From<&Statement> for Arg {
    fn from(value: &Statement) -> Self {
        Arg::Eq(value.into())
    }
}

/// How many calls an expectation answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Times {
    /// Any number of calls, at least one for `assert_expectations`.
    #[default]
    Unlimited,
    /// Exactly `n` calls; the expectation is exhausted afterwards.
    Exactly(usize),
    /// Any number of calls, including none.
    Maybe,
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Times::Unlimited => f.write_str("at least once"),
            Times::Exactly(n) => write!(f, "exactly {n} time(s)"),
            Times::Maybe => f.write_str("any number of times"),
        }
    }
}

/// The value a matched call produces.
#[derive(Debug, Clone)]
pub enum Returns {
    Unit,
    Error(Result<(), DatabaseError>),
    Transaction(Result<MockTransaction, DatabaseError>),
    Rows(Result<Rows, DatabaseError>),
    Row(Row),
    Prepared(Result<Statement, DatabaseError>),
    Statement(Statement),
    Exec(Result<ExecResult, DatabaseError>),
    Driver(DriverInfo),
    Stats(PoolStats),
}

impl Returns {
    #[must_use]
    pub fn kind(&self) -> ReturnKind {
        match self {
            Returns::Unit => ReturnKind::Unit,
            Returns::Error(_) => ReturnKind::Error,
            Returns::Transaction(_) => ReturnKind::Transaction,
            Returns::Rows(_) => ReturnKind::Rows,
            Returns::Row(_) => ReturnKind::Row,
            Returns::Prepared(_) => ReturnKind::Prepared,
            Returns::Statement(_) => ReturnKind::Statement,
            Returns::Exec(_) => ReturnKind::Exec,
            Returns::Driver(_) => ReturnKind::Driver,
            Returns::Stats(_) => ReturnKind::Stats,
        }
    }
}

/// Shape of the value a method returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Unit,
    Error,
    Transaction,
    Rows,
    Row,
    Prepared,
    Statement,
    Exec,
    Driver,
    Stats,
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnKind::Unit => "nothing",
            ReturnKind::Error => "error",
            ReturnKind::Transaction => "(transaction, error)",
            ReturnKind::Rows => "(rows, error)",
            ReturnKind::Row => "row",
            ReturnKind::Prepared => "(statement, error)",
            ReturnKind::Statement => "statement",
            ReturnKind::Exec => "(exec result, error)",
            ReturnKind::Driver => "driver",
            ReturnKind::Stats => "stats",
        };
        f.write_str(name)
    }
}

/// Typed view of a [`Returns`] variant.
///
/// Typed expectation builders take `Self::Output` directly, so a test
/// cannot register a value of the wrong shape for a method.
pub trait ReturnShape {
    type Output;

    /// The variant this shape unpacks, `None` for any.
    fn kind() -> Option<ReturnKind>;

    fn into_returns(output: Self::Output) -> Returns;

    /// Unpacks a registered value, handing it back if the variant differs.
    fn from_returns(returns: Returns) -> Result<Self::Output, Returns>;
}

macro_rules! return_shape {
    ($shape:ident, $variant:ident, $output:ty) => {
        #[derive(Debug)]
        pub struct $shape;

        impl ReturnShape for $shape {
            type Output = $output;

            fn kind() -> Option<ReturnKind> {
                Some(ReturnKind::$variant)
            }

            fn into_returns(output: Self::Output) -> Returns {
                Returns::$variant(output)
            }

            fn from_returns(returns: Returns) -> Result<Self::Output, Returns> {
                match returns {
                    Returns::$variant(output) => Ok(output),
                    other => Err(other),
                }
            }
        }
    };
}

return_shape!(ErrorShape, Error, Result<(), DatabaseError>);
return_shape!(TransactionShape, Transaction, Result<MockTransaction, DatabaseError>);
return_shape!(RowsShape, Rows, Result<Rows, DatabaseError>);
return_shape!(RowShape, Row, Row);
return_shape!(PreparedShape, Prepared, Result<Statement, DatabaseError>);
return_shape!(StatementShape, Statement, Statement);
return_shape!(ExecShape, Exec, Result<ExecResult, DatabaseError>);
return_shape!(DriverShape, Driver, DriverInfo);
return_shape!(StatsShape, Stats, PoolStats);

#[derive(Debug)]
pub struct UnitShape;

impl ReturnShape for UnitShape {
    type Output = ();

    fn kind() -> Option<ReturnKind> {
        Some(ReturnKind::Unit)
    }

    fn into_returns((): ()) -> Returns {
        Returns::Unit
    }

    fn from_returns(returns: Returns) -> Result<(), Returns> {
        match returns {
            Returns::Unit => Ok(()),
            other => Err(other),
        }
    }
}

/// Untyped shape used by the generic recorder API; checked at registration.
#[derive(Debug)]
pub struct AnyShape;

impl ReturnShape for AnyShape {
    type Output = Returns;

    fn kind() -> Option<ReturnKind> {
        None
    }

    fn into_returns(output: Returns) -> Returns {
        output
    }

    fn from_returns(returns: Returns) -> Result<Returns, Returns> {
        Ok(returns)
    }
}

/// A registered (method, arguments) → return value rule.
#[derive(Clone)]
pub(crate) struct Expectation {
    pub method: String,
    pub args: Vec<Arg>,
    pub returns: Returns,
    pub times: Times,
    pub calls: usize,
    pub run: Option<RunFn>,
}

impl Expectation {
    pub fn matches(&self, method: &str, args: &[Value]) -> bool {
        self.method == method
            && self.args.len() == args.len()
            && self.args.iter().zip(args).all(|(arg, value)| arg.matches(value))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.times, Times::Exactly(n) if self.calls >= n)
    }

    pub fn is_satisfied(&self) -> bool {
        match self.times {
            Times::Unlimited => self.calls > 0,
            Times::Exactly(n) => self.calls == n,
            Times::Maybe => true,
        }
    }

    pub fn signature(&self) -> String {
        format!("{}({})", self.method, display_list(&self.args))
    }
}

/// Builder returned by `expect_*` methods.
///
/// Call-count modifiers come first; `returns` registers the expectation.
#[must_use = "an expectation is only registered once `returns` is called"]
pub struct Expect<'a, S: ReturnShape> {
    recorder: &'a Recorder,
    method: String,
    args: Vec<Arg>,
    times: Times,
    run: Option<RunFn>,
    shape: PhantomData<S>,
}

impl<'a, S: ReturnShape> Expect<'a, S> {
    pub(crate) fn new(recorder: &'a Recorder, method: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            recorder,
            method: method.into(),
            args,
            times: Times::Unlimited,
            run: None,
            shape: PhantomData,
        }
    }

    pub fn once(self) -> Self {
        self.times(1)
    }

    pub fn twice(self) -> Self {
        self.times(2)
    }

    pub fn times(mut self, n: usize) -> Self {
        self.times = Times::Exactly(n);
        self
    }

    /// Makes the expectation optional for `assert_expectations`.
    pub fn maybe(mut self) -> Self {
        self.times = Times::Maybe;
        self
    }

    /// Runs `f` with the call's flattened arguments each time it matches.
    pub fn run(mut self, f: impl Fn(&[Value]) + Send + Sync + 'static) -> Self {
        self.run = Some(Arc::new(f));
        self
    }

    /// Registers the expectation with the value every matching call returns.
    ///
    /// # Panics
    ///
    /// Panics when the recorder does not know the method or the method
    /// returns a different shape.
    pub fn returns(self, output: S::Output) {
        self.recorder.register(Expectation {
            method: self.method,
            args: self.args,
            returns: S::into_returns(output),
            times: self.times,
            calls: 0,
            run: self.run,
        });
    }
}

impl<S: ReturnShape<Output = Result<(), DatabaseError>>> Expect<'_, S> {
    /// Registers a successful (`Ok(())`) return.
    pub fn returns_ok(self) {
        self.returns(Ok(()));
    }
}

impl Expect<'_, UnitShape> {
    /// Registers a call that returns nothing.
    pub fn record(self) {
        self.returns(());
    }
}
