#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
use std::os::raw::{c_char, c_int, c_void};

/// Opaque error object. Owned by the caller once returned; release with
/// `libsql_error_deinit`.
#[repr(C)]
pub struct libsql_error_t {
    _private: [u8; 0],
}

/// Value type tag. Plain `c_int`: the engine may hand back any value.
pub type libsql_type_t = c_int;

pub const LIBSQL_TYPE_INTEGER: libsql_type_t = 1;
pub const LIBSQL_TYPE_REAL: libsql_type_t = 2;
pub const LIBSQL_TYPE_TEXT: libsql_type_t = 3;
pub const LIBSQL_TYPE_BLOB: libsql_type_t = 4;
pub const LIBSQL_TYPE_NULL: libsql_type_t = 5;

/// Every resource handle is returned by value as `{err, inner}`.
///
/// When `err` is non-null the call failed and `inner` must not be used.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_database_t {
    pub err: *mut libsql_error_t,
    pub inner: *mut c_void,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_connection_t {
    pub err: *mut libsql_error_t,
    pub inner: *mut c_void,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_statement_t {
    pub err: *mut libsql_error_t,
    pub inner: *mut c_void,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_transaction_t {
    pub err: *mut libsql_error_t,
    pub inner: *mut c_void,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_rows_t {
    pub err: *mut libsql_error_t,
    pub inner: *mut c_void,
}

/// A single row. `inner == null` with `err == null` is the end-of-rows marker.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_row_t {
    pub err: *mut libsql_error_t,
    pub inner: *mut c_void,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_batch_t {
    pub err: *mut libsql_error_t,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_bind_t {
    pub err: *mut libsql_error_t,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_execute_t {
    pub err: *mut libsql_error_t,
    pub rows_changed: u64,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_sync_t {
    pub err: *mut libsql_error_t,
    pub frame_no: u64,
    pub frames_synced: u64,
}

/// Engine-owned byte slice (not NUL-terminated). Release with
/// `libsql_slice_deinit` once copied.
///
/// `ptr` may be non-null even when `len == 0`; do not dereference when `len == 0`.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_slice_t {
    pub ptr: *const c_void,
    pub len: usize,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union libsql_value_union_t {
    pub integer: i64,
    pub real: f64,
    pub text: libsql_slice_t,
    pub blob: libsql_slice_t,
}

/// Tagged value. Text/blob values built by `libsql_text`/`libsql_blob` borrow
/// the caller's buffer; values read from a row own an engine slice.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct libsql_value_t {
    pub value: libsql_value_union_t,
    pub type_: libsql_type_t,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct libsql_result_value_t {
    pub err: *mut libsql_error_t,
    pub ok: libsql_value_t,
}

/// Database descriptor. Null string pointers mean "unset".
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct libsql_database_desc_t {
    pub url: *const c_char,
    pub path: *const c_char,
    pub auth_token: *const c_char,
    pub encryption_key: *const c_char,
    pub sync_interval: u64,
    pub not_read_your_writes: bool,
    pub webpki: bool,
}
