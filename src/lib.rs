//! Rust driver for the libsql C ABI.
//!
//! Opens in-memory, local-file, remote and embedded-replica databases through a dynamically
//! loaded native libsql library and exposes them as [`Connector`] → [`Connection`] →
//! [`Statement`] → [`Rows`], with explicit single-level [`Transaction`]s.
//!
//! ```no_run
//! use libsql_driver::{Driver, Value};
//!
//! # fn main() -> libsql_driver::Result<()> {
//! let conn = Driver.open(":memory:")?;
//! let mut stmt = conn.prepare("select ?1 + 1")?;
//! for row in stmt.query(&[Value::Integer(41)])? {
//!     println!("{:?}", row?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Every handle releases its native resource on `close` or on drop, whichever comes first.
//! Handles are `!Send`; open one connection per thread.
#![allow(unsafe_code)]

mod api;
mod config;
mod connection;
mod database;
mod driver;
mod error;
mod runtime;
mod statement;
mod sys;
mod value;

#[cfg(test)]
mod fake;

pub use config::{ConnectorOptions, DatabaseKind, ReplicaBuilder, ReplicaOption};
pub use connection::{Batchable, Connection, IsolationLevel, Transaction, TxOptions};
pub use database::{Connector, Replicated};
pub use driver::{Driver, DRIVER_NAME};
pub use error::{Error, OptionError, OptionErrors, Result};
pub use runtime::{runtime, Runtime};
pub use statement::{ExecResult, Rows, Statement};
pub use value::{format_timestamp, parse_timestamp, NamedValue, TimestampDecoding, Value};
