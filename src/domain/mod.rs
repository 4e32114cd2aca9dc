//! Domain layer containing the client traits, value types and errors.

pub mod error;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{ConfigError, DatabaseError, MockError};
pub use traits::{Connection, Transaction};
pub use types::{DriverInfo, ExecResult, PoolStats, Row, Rows, Statement};
pub use value::{Value, flatten_args};
