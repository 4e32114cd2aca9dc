//! Call recorder and expectation matcher shared by the test doubles.
//!
//! Every double owns a [`Recorder`]. A call is forwarded as a method name
//! plus its flattened argument list; the recorder logs it, finds the first
//! registered expectation that matches and is not exhausted, and hands back
//! that expectation's return value. A call nothing matches panics, which
//! fails the running test.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::RecorderConfig;
use crate::domain::value::display_list;
use crate::domain::{MockError, Value};

use super::expectation::{AnyShape, Arg, Expect, Expectation, ReturnKind, ReturnShape, Returns};

/// Methods a recorder accepts, with the shape each one returns.
pub type MethodTable = &'static [(&'static str, ReturnKind)];

/// One invocation seen by a recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub method: String,
    pub args: Vec<Value>,
    pub at: DateTime<Utc>,
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.method, display_list(&self.args))
    }
}

#[derive(Default)]
struct State {
    expectations: Vec<Expectation>,
    calls: Vec<CallRecord>,
}

/// Records calls and answers them from registered expectations.
///
/// # Example
///
/// ```
/// use sql_test_doubles::config::RecorderConfig;
/// use sql_test_doubles::mocks::{Recorder, Returns};
///
/// let recorder = Recorder::new(RecorderConfig::default());
/// recorder.expect("ping", vec![]).once().returns(Returns::Error(Ok(())));
///
/// let out = recorder.record("ping", vec![]);
/// assert!(matches!(out, Returns::Error(Ok(()))));
/// recorder.assert_expectations();
/// ```
pub struct Recorder {
    config: RecorderConfig,
    methods: Option<MethodTable>,
    state: Mutex<State>,
}

impl Recorder {
    /// Creates a recorder that accepts any method name and return shape.
    #[must_use]
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            methods: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Creates a recorder restricted to `methods`.
    ///
    /// Registering an unknown method, or a return value whose shape differs
    /// from the table, panics at registration time.
    #[must_use]
    pub fn with_methods(config: RecorderConfig, methods: MethodTable) -> Self {
        Self {
            config,
            methods: Some(methods),
            state: Mutex::new(State::default()),
        }
    }

    /// Name that prefixes every diagnostic from this recorder.
    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// The configuration this recorder was built with.
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Starts an untyped expectation for `method` with argument matchers.
    pub fn expect(&self, method: impl Into<String>, args: Vec<Arg>) -> Expect<'_, AnyShape> {
        Expect::new(self, method, args)
    }

    /// Starts an expectation whose return value is typed by `S`.
    pub fn expect_as<S: ReturnShape>(
        &self,
        method: impl Into<String>,
        args: Vec<Arg>,
    ) -> Expect<'_, S> {
        Expect::new(self, method, args)
    }

    pub(crate) fn register(&self, expectation: Expectation) {
        if let Err(err) = self.try_register(expectation) {
            self.fail(&err);
        }
    }

    fn try_register(&self, expectation: Expectation) -> Result<(), MockError> {
        if let Some(methods) = self.methods {
            let declared = methods
                .iter()
                .find(|(name, _)| *name == expectation.method)
                .map(|(_, kind)| *kind)
                .ok_or_else(|| MockError::UnknownMethod {
                    label: self.config.label.clone(),
                    method: expectation.method.clone(),
                })?;
            let got = expectation.returns.kind();
            if declared != got {
                return Err(MockError::ReturnShapeMismatch {
                    label: self.config.label.clone(),
                    method: expectation.method.clone(),
                    expected: declared.to_string(),
                    got: got.to_string(),
                });
            }
        }

        debug!(
            label = %self.config.label,
            signature = %expectation.signature(),
            times = %expectation.times,
            "registered expectation"
        );
        self.state().expectations.push(expectation);
        Ok(())
    }

    /// Records a call and returns the registered value for it.
    ///
    /// # Errors
    /// Returns `MockError::UnexpectedCall` when no registered, non-exhausted
    /// expectation matches the call.
    pub fn try_record(&self, method: &str, args: Vec<Value>) -> Result<Returns, MockError> {
        if self.config.log_calls {
            debug!(
                label = %self.config.label,
                method,
                args = %display_list(&args),
                "recorded call"
            );
        }

        let (returns, run) = {
            let mut state = self.state();
            state.calls.push(CallRecord {
                method: method.to_string(),
                args: args.clone(),
                at: Utc::now(),
            });

            let position = state
                .expectations
                .iter()
                .position(|e| !e.is_exhausted() && e.matches(method, &args));
            let Some(index) = position else {
                return Err(self.unexpected_call(&state, method, &args));
            };
            let expectation = &mut state.expectations[index];
            expectation.calls += 1;
            (expectation.returns.clone(), expectation.run.clone())
        };

        if let Some(run) = run {
            run(&args);
        }
        Ok(returns)
    }

    /// Records a call and returns the registered value for it.
    ///
    /// # Panics
    /// Panics when the call matches no registered expectation.
    pub fn record(&self, method: &str, args: Vec<Value>) -> Returns {
        match self.try_record(method, args) {
            Ok(returns) => returns,
            Err(err) => self.fail(&err),
        }
    }

    /// Records a call and unpacks the return value as shape `S`.
    ///
    /// # Panics
    /// Panics when the call is unexpected or the registered value has a
    /// different shape.
    pub fn call<S: ReturnShape>(&self, method: &str, args: Vec<Value>) -> S::Output {
        let returns = self.record(method, args);
        match S::from_returns(returns) {
            Ok(output) => output,
            Err(other) => self.fail(&MockError::ReturnShapeMismatch {
                label: self.config.label.clone(),
                method: method.to_string(),
                expected: S::kind().map_or_else(|| "any".to_string(), |k| k.to_string()),
                got: other.kind().to_string(),
            }),
        }
    }

    /// All calls recorded so far, in call order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.state().calls.clone()
    }

    /// Calls recorded for `method` only, in call order.
    pub fn calls_to(&self, method: &str) -> Vec<CallRecord> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// The call log as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `MockError::Serialization` if a value cannot be encoded.
    pub fn calls_json(&self) -> Result<String, MockError> {
        Ok(serde_json::to_string_pretty(&self.calls())?)
    }

    pub fn number_of_calls(&self, method: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Checks that `method` was called exactly `times` times with `args`.
    ///
    /// # Errors
    /// Returns `MockError::CallCountMismatch` with the observed count.
    pub fn check_called(
        &self,
        method: &str,
        args: &[Value],
        times: usize,
    ) -> Result<(), MockError> {
        let actual = self
            .state()
            .calls
            .iter()
            .filter(|c| c.method == method && c.args == args)
            .count();
        if actual == times {
            return Ok(());
        }
        Err(MockError::CallCountMismatch {
            label: self.config.label.clone(),
            method: method.to_string(),
            args: display_list(args),
            expected: times,
            actual,
        })
    }

    /// # Panics
    /// Panics unless `method` was called exactly `times` times with `args`.
    pub fn assert_called(&self, method: &str, args: &[Value], times: usize) {
        if let Err(err) = self.check_called(method, args, times) {
            self.fail(&err);
        }
    }

    /// # Panics
    /// Panics if `method` was ever called with `args`.
    pub fn assert_not_called(&self, method: &str, args: &[Value]) {
        self.assert_called(method, args, 0);
    }

    /// # Panics
    /// Panics unless `method` was called `times` times, whatever the arguments.
    pub fn assert_number_of_calls(&self, method: &str, times: usize) {
        let actual = self.number_of_calls(method);
        if actual != times {
            self.fail(&MockError::CallCountMismatch {
                label: self.config.label.clone(),
                method: method.to_string(),
                args: "..".to_string(),
                expected: times,
                actual,
            });
        }
    }

    /// Checks that every registered expectation received its calls.
    ///
    /// # Errors
    /// Returns `MockError::UnmetExpectations` listing the short ones.
    pub fn verify_expectations(&self) -> Result<(), MockError> {
        let unmet: Vec<String> = self
            .state()
            .expectations
            .iter()
            .filter(|e| !e.is_satisfied())
            .map(|e| {
                format!(
                    "  {} expected {}, called {} time(s)",
                    e.signature(),
                    e.times,
                    e.calls
                )
            })
            .collect();

        if unmet.is_empty() {
            return Ok(());
        }
        Err(MockError::UnmetExpectations {
            label: self.config.label.clone(),
            count: unmet.len(),
            details: unmet.join("\n"),
        })
    }

    /// # Panics
    /// Panics if any expectation was not called the configured number of times.
    pub fn assert_expectations(&self) {
        if let Err(err) = self.verify_expectations() {
            self.fail(&err);
        }
    }

    /// Drops all expectations and recorded calls.
    pub fn reset(&self) {
        let mut state = self.state();
        state.expectations.clear();
        state.calls.clear();
    }

    fn unexpected_call(&self, state: &State, method: &str, args: &[Value]) -> MockError {
        let registered: Vec<String> = state
            .expectations
            .iter()
            .filter(|e| e.method == method)
            .map(|e| {
                if e.is_exhausted() {
                    format!("{} [exhausted after {} call(s)]", e.signature(), e.calls)
                } else {
                    e.signature()
                }
            })
            .collect();

        MockError::UnexpectedCall {
            label: self.config.label.clone(),
            method: method.to_string(),
            args: display_list(args),
            registered: if registered.is_empty() {
                "none".to_string()
            } else {
                registered.join("; ")
            },
        }
    }

    fn fail(&self, err: &MockError) -> ! {
        error!(label = %self.config.label, "{err}");
        panic!("{err}");
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Recorder")
            .field("label", &self.config.label)
            .field("expectations", &state.expectations.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}
