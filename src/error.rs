//! Error type shared by every layer of the driver.

use std::ffi::CStr;
use std::fmt;

use thiserror::Error;

use crate::api::Api;
use crate::connection::IsolationLevel;
use crate::sys::libsql_error_t;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the driver.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// One or more options were rejected while building a configuration.
    #[error("{0}")]
    Options(OptionErrors),

    /// Connection string uses a scheme this driver cannot open.
    #[error(
        "unsupported URL scheme: {0}\nThis driver supports only URLs that start with libsql://, file:, https:// or http://"
    )]
    UnsupportedScheme(String),

    /// Connection string could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("read only transactions are not supported")]
    ReadOnlyTransaction,

    #[error("isolation level {0} is not supported")]
    UnsupportedIsolation(IsolationLevel),

    #[error("already inside a transaction")]
    NestedTransaction,

    #[error("Not inside a transaction")]
    NotInTransaction,

    /// A string passed to the engine contained an interior NUL byte.
    #[error("{0} contains NUL")]
    Nul(&'static str),

    /// The handle was already closed.
    #[error("{0} is closed")]
    Closed(&'static str),

    /// The caller's cancellation flag was set before the native call started.
    #[error("operation cancelled")]
    Cancelled,

    /// Error reported by the native engine.
    #[error("libsql error: {message}")]
    Native { message: String },

    /// The native library could not be loaded or is missing symbols.
    #[error("{0}")]
    Runtime(String),
}

impl Error {
    pub(crate) fn native(message: impl Into<String>) -> Self {
        Self::Native {
            message: message.into(),
        }
    }
}

/// A single rejected option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    AlreadySet(&'static str),
    Empty(&'static str),
}

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionError::AlreadySet(name) => write!(f, "{name} already set"),
            OptionError::Empty(name) => write!(f, "{name} must not be empty"),
        }
    }
}

/// Every option violation collected during one build, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionErrors(pub Vec<OptionError>);

impl OptionErrors {
    pub fn iter(&self) -> impl Iterator<Item = &OptionError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OptionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// Translate a native error into [`Error::Native`], releasing it.
///
/// # Safety
///
/// `err` must be a non-null error object returned by `api` that has not been released yet.
/// It is invalid after this call.
pub(crate) unsafe fn take_error(api: &Api, err: *mut libsql_error_t) -> Error {
    let msg = (api.libsql_error_message)(err);
    let message = if msg.is_null() {
        String::new()
    } else {
        CStr::from_ptr(msg).to_string_lossy().into_owned()
    };
    (api.libsql_error_deinit)(err);
    Error::native(message)
}

/// `Ok(())` for a null error pointer, otherwise the translated error.
pub(crate) fn check(api: &Api, err: *mut libsql_error_t) -> Result<()> {
    if err.is_null() {
        Ok(())
    } else {
        Err(unsafe { take_error(api, err) })
    }
}
