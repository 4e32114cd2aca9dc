//! Error types for the database client surface and the test doubles.
//!
//! [`DatabaseError`] values are registered by a test and returned through
//! `Result`, while [`MockError`] describes a double that was not set up for
//! the call it received and ends the test.

use thiserror::Error;

/// Errors a database client can report to its caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Connection is closed")]
    ConnectionClosed,
    #[error("Query execution failed: {0}")]
    Query(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Duplicate record: {0}")]
    Duplicate(String),
    #[error("Pool exhausted: {0}")]
    PoolExhausted(String),
    #[error("Transaction has already been committed or rolled back")]
    TxDone,
    #[error("{0}")]
    Other(String),
}

/// A test double received a call it was not configured to answer.
#[derive(Error, Debug)]
pub enum MockError {
    #[error(
        "{label}: unexpected call {method}({args}); registered signatures for {method}: {registered}"
    )]
    UnexpectedCall {
        label: String,
        method: String,
        args: String,
        registered: String,
    },
    #[error("{label}: {method} is not a method of this double")]
    UnknownMethod { label: String, method: String },
    #[error("{label}: {method} must return {expected}, but {got} was registered")]
    ReturnShapeMismatch {
        label: String,
        method: String,
        expected: String,
        got: String,
    },
    #[error("{label}: expected {method}({args}) to be called {expected} time(s), got {actual}")]
    CallCountMismatch {
        label: String,
        method: String,
        args: String,
        expected: usize,
        actual: usize,
    },
    #[error("{label}: {count} expectation(s) not met:\n{details}")]
    UnmetExpectations {
        label: String,
        count: usize,
        details: String,
    },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MockError {
    fn from(err: serde_json::Error) -> Self {
        MockError::Serialization(err.to_string())
    }
}

/// Errors raised while loading recorder configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<&str> for ConfigError {
    fn from(s: &str) -> Self {
        ConfigError::ParseError(s.to_string())
    }
}
