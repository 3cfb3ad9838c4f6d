//! libsql runtime loader and process-wide API singleton.
//!
//! The native library is located, opened with `libloading`, and every ABI symbol is resolved
//! into an [`Api`] table once per process. [`runtime()`] hands out the shared [`Runtime`].
//!
//! ## Environment variables
//!
//! - `LIBSQL_RUNTIME_PATH` *(optional)*: full path of the library to load. Takes precedence over
//!   everything else.
//! - `LIBSQL_LIB_DIR` *(optional)*: directory containing the library under its platform file name
//!   (`liblibsql.so`, `liblibsql.dylib`, `libsql.dll`).
//!
//! Without either variable the platform file name is handed to the system loader, which searches
//! its usual paths (`LD_LIBRARY_PATH`, `DYLD_LIBRARY_PATH`, `PATH`, ...).
//!
//! ## Loading
//!
//! Nothing is loaded until the first database is opened. A load failure is remembered: every
//! later call gets a clone of the same [`Error::Runtime`].

use std::{
    env,
    ffi::OsString,
    path::PathBuf,
    sync::OnceLock,
};

use libloading::Library;
use tracing::debug;

use crate::{api::Api, Error, Result};

static RUNTIME: OnceLock<Result<Runtime>> = OnceLock::new();

/// The loaded native library. It stays mapped for the life of the process.
///
/// `path` is what was handed to the loader: a full path, or a bare file name when the system
/// search path was used.
pub struct Runtime {
    _lib: Library,
    pub(crate) api: Api,
    pub path: PathBuf,
}

/// Get the process-wide libsql runtime singleton.
///
/// # Errors
///
/// Returns [`Error::Runtime`] if the library cannot be loaded or a required symbol is
/// missing. The same error is returned on every later call.
pub fn runtime() -> Result<&'static Runtime> {
    match RUNTIME.get_or_init(Runtime::init) {
        Ok(rt) => Ok(rt),
        Err(e) => Err(e.clone()),
    }
}

/// Shorthand for `&runtime()?.api`.
pub(crate) fn api() -> Result<&'static Api> {
    runtime().map(|rt| &rt.api)
}

impl Runtime {
    /// Selection order:
    /// 1. `LIBSQL_RUNTIME_PATH`
    /// 2. `LIBSQL_LIB_DIR` joined with the platform file name
    /// 3. the platform file name alone (system loader search)
    fn init() -> Result<Self> {
        let path = match env::var_os("LIBSQL_RUNTIME_PATH") {
            Some(p) => PathBuf::from(p),
            None => {
                let filename: OsString = libloading::library_filename("libsql");
                match env::var_os("LIBSQL_LIB_DIR") {
                    Some(dir) => PathBuf::from(dir).join(filename),
                    None => PathBuf::from(filename),
                }
            }
        };
        unsafe { Self::load_from_path(path) }
    }

    /// Load the library at `path` and resolve its ABI into an [`Api`].
    ///
    /// # Safety
    ///
    /// `path` must name a libsql C library built for this process (platform, arch, ABI).
    /// Loading runs the library's initializers, and calling a symbol whose signature differs
    /// from [`Api`] is undefined behaviour.
    unsafe fn load_from_path(path: PathBuf) -> Result<Self> {
        let lib = Library::new(&path).map_err(|e| {
            Error::Runtime(format!(
                "failed to load libsql runtime '{}': {e}",
                path.display()
            ))
        })?;

        let api = Api::load(&lib).map_err(|e| {
            Error::Runtime(format!(
                "failed to resolve libsql symbols from '{}': {e}",
                path.display()
            ))
        })?;

        debug!(path = %path.display(), "loaded libsql runtime");

        Ok(Self {
            _lib: lib,
            api,
            path,
        })
    }
}
