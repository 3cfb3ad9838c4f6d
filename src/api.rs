#![allow(non_snake_case)]
use std::os::raw::c_char;

use libloading::{Library, Symbol};

use crate::sys::*;

/// Resolved libsql C ABI entrypoints.
///
/// Every handle wrapper holds a `&'static Api` and calls through it; nothing
/// in the crate links against the engine directly.
pub struct Api {
    pub libsql_error_message: unsafe extern "C" fn(*mut libsql_error_t) -> *const c_char,
    pub libsql_error_deinit: unsafe extern "C" fn(*mut libsql_error_t),

    pub libsql_database_init: unsafe extern "C" fn(libsql_database_desc_t) -> libsql_database_t,
    pub libsql_database_sync: unsafe extern "C" fn(libsql_database_t) -> libsql_sync_t,
    pub libsql_database_connect: unsafe extern "C" fn(libsql_database_t) -> libsql_connection_t,
    pub libsql_database_deinit: unsafe extern "C" fn(libsql_database_t),

    pub libsql_connection_transaction:
        unsafe extern "C" fn(libsql_connection_t) -> libsql_transaction_t,
    pub libsql_connection_batch:
        unsafe extern "C" fn(libsql_connection_t, *const c_char) -> libsql_batch_t,
    pub libsql_connection_prepare:
        unsafe extern "C" fn(libsql_connection_t, *const c_char) -> libsql_statement_t,
    pub libsql_connection_deinit: unsafe extern "C" fn(libsql_connection_t),

    pub libsql_transaction_batch:
        unsafe extern "C" fn(libsql_transaction_t, *const c_char) -> libsql_batch_t,
    pub libsql_transaction_commit: unsafe extern "C" fn(libsql_transaction_t),
    pub libsql_transaction_rollback: unsafe extern "C" fn(libsql_transaction_t),

    pub libsql_statement_bind_value:
        unsafe extern "C" fn(libsql_statement_t, libsql_value_t) -> libsql_bind_t,
    pub libsql_statement_bind_named: unsafe extern "C" fn(
        libsql_statement_t,
        *const c_char,
        libsql_value_t,
    ) -> libsql_bind_t,
    pub libsql_statement_execute: unsafe extern "C" fn(libsql_statement_t) -> libsql_execute_t,
    pub libsql_statement_query: unsafe extern "C" fn(libsql_statement_t) -> libsql_rows_t,
    pub libsql_statement_deinit: unsafe extern "C" fn(libsql_statement_t),

    pub libsql_rows_next: unsafe extern "C" fn(libsql_rows_t) -> libsql_row_t,
    pub libsql_rows_column_name: unsafe extern "C" fn(libsql_rows_t, i32) -> libsql_slice_t,
    pub libsql_rows_column_length: unsafe extern "C" fn(libsql_rows_t) -> i32,
    pub libsql_rows_deinit: unsafe extern "C" fn(libsql_rows_t),

    pub libsql_row_value: unsafe extern "C" fn(libsql_row_t, i32) -> libsql_result_value_t,
    pub libsql_row_empty: unsafe extern "C" fn(libsql_row_t) -> bool,
    pub libsql_row_deinit: unsafe extern "C" fn(libsql_row_t),

    pub libsql_integer: unsafe extern "C" fn(i64) -> libsql_value_t,
    pub libsql_real: unsafe extern "C" fn(f64) -> libsql_value_t,
    pub libsql_text: unsafe extern "C" fn(*const c_char, usize) -> libsql_value_t,
    pub libsql_blob: unsafe extern "C" fn(*const u8, usize) -> libsql_value_t,
    pub libsql_null: unsafe extern "C" fn() -> libsql_value_t,
    pub libsql_slice_deinit: unsafe extern "C" fn(libsql_slice_t),
}

impl Api {
    /// Resolve every entrypoint from `lib`.
    ///
    /// # Safety
    ///
    /// `lib` must be a libsql C library whose exported symbols match the
    /// signatures above; a mismatch is undefined behaviour on first call.
    pub unsafe fn load(lib: &Library) -> Result<Self, libloading::Error> {
        unsafe fn get<T: Copy>(lib: &Library, name: &'static [u8]) -> Result<T, libloading::Error> {
            let sym: Symbol<T> = lib.get::<T>(name)?;
            Ok(*sym)
        }

        macro_rules! sym {
            ($name:ident) => {
                get(lib, concat!(stringify!($name), "\0").as_bytes())?
            };
        }

        Ok(Self {
            libsql_error_message: sym!(libsql_error_message),
            libsql_error_deinit: sym!(libsql_error_deinit),
            libsql_database_init: sym!(libsql_database_init),
            libsql_database_sync: sym!(libsql_database_sync),
            libsql_database_connect: sym!(libsql_database_connect),
            libsql_database_deinit: sym!(libsql_database_deinit),
            libsql_connection_transaction: sym!(libsql_connection_transaction),
            libsql_connection_batch: sym!(libsql_connection_batch),
            libsql_connection_prepare: sym!(libsql_connection_prepare),
            libsql_connection_deinit: sym!(libsql_connection_deinit),
            libsql_transaction_batch: sym!(libsql_transaction_batch),
            libsql_transaction_commit: sym!(libsql_transaction_commit),
            libsql_transaction_rollback: sym!(libsql_transaction_rollback),
            libsql_statement_bind_value: sym!(libsql_statement_bind_value),
            libsql_statement_bind_named: sym!(libsql_statement_bind_named),
            libsql_statement_execute: sym!(libsql_statement_execute),
            libsql_statement_query: sym!(libsql_statement_query),
            libsql_statement_deinit: sym!(libsql_statement_deinit),
            libsql_rows_next: sym!(libsql_rows_next),
            libsql_rows_column_name: sym!(libsql_rows_column_name),
            libsql_rows_column_length: sym!(libsql_rows_column_length),
            libsql_rows_deinit: sym!(libsql_rows_deinit),
            libsql_row_value: sym!(libsql_row_value),
            libsql_row_empty: sym!(libsql_row_empty),
            libsql_row_deinit: sym!(libsql_row_deinit),
            libsql_integer: sym!(libsql_integer),
            libsql_real: sym!(libsql_real),
            libsql_text: sym!(libsql_text),
            libsql_blob: sym!(libsql_blob),
            libsql_null: sym!(libsql_null),
            libsql_slice_deinit: sym!(libsql_slice_deinit),
        })
    }
}
