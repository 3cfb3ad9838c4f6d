//! In-process stand-in for the libsql C library, used by the unit tests.
//!
//! - A query returns the rows queued with [`queue_rows`], or else one row that echoes every bound
//!   value in bind order (columns named after the parameter, or `?N`).
//! - [`fail_on`] makes the next call of the named entrypoint report an error.
//! - Every init/deinit is counted in [`Counters`].
//!
//! State is thread-local, so tests running in parallel do not see each other.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::sync::OnceLock;

use crate::api::Api;
use crate::sys::*;

#[derive(Debug, Clone, PartialEq)]
pub enum FakeValue {
    Integer(i64),
    Real(f64),
    Text(Vec<u8>),
    Blob(Vec<u8>),
    Null,
}

#[derive(Debug, Default, Clone)]
pub struct Counters {
    pub database_deinit: usize,
    pub connect: usize,
    pub connection_deinit: usize,
    pub transaction_begin: usize,
    pub commit: usize,
    pub rollback: usize,
    pub statement_deinit: usize,
    pub execute: usize,
    pub rows_deinit: usize,
    pub row_deinit: usize,
    pub slice_deinit: usize,
    pub error_deinit: usize,
    pub sync: usize,
}

/// Copy of the last `libsql_database_desc_t` passed to `database_init`.
#[derive(Debug, Default, Clone)]
pub struct DescSnapshot {
    pub url: Option<String>,
    pub path: Option<String>,
    pub auth_token: Option<String>,
    pub encryption_key: Option<String>,
    pub sync_interval: u64,
    pub not_read_your_writes: bool,
    pub webpki: bool,
}

type Bind = (Option<String>, FakeValue);

#[derive(Default)]
struct State {
    counters: Counters,
    desc: Option<DescSnapshot>,
    failures: HashMap<&'static str, String>,
    queued: Option<(Vec<String>, Vec<Vec<FakeValue>>)>,
    batches: Vec<(String, &'static str)>,
    last_binds: Vec<Bind>,
    rows_changed: u64,
    sync: (u64, u64),
}

thread_local! {
    static STATE: RefCell<State> = RefCell::new(State::default());
}

fn with<R>(f: impl FnOnce(&mut State) -> R) -> R {
    STATE.with(|s| f(&mut s.borrow_mut()))
}

pub fn reset() {
    with(|s| *s = State::default());
}

pub fn counters() -> Counters {
    with(|s| s.counters.clone())
}

pub fn last_desc() -> Option<DescSnapshot> {
    with(|s| s.desc.clone())
}

pub fn fail_on(call: &'static str, message: &str) {
    with(|s| s.failures.insert(call, message.to_string()));
}

pub fn queue_rows(columns: &[&str], rows: Vec<Vec<FakeValue>>) {
    let columns = columns.iter().map(|c| c.to_string()).collect();
    with(|s| s.queued = Some((columns, rows)));
}

pub fn batches() -> Vec<(String, &'static str)> {
    with(|s| s.batches.clone())
}

pub fn last_binds() -> Vec<Bind> {
    with(|s| s.last_binds.clone())
}

pub fn set_rows_changed(n: u64) {
    with(|s| s.rows_changed = n);
}

pub fn set_sync_result(frame_no: u64, frames_synced: u64) {
    with(|s| s.sync = (frame_no, frames_synced));
}

/// A text value whose slice is owned by the fake, as `row_value` would return it.
pub fn owned_text_value(s: &str) -> libsql_value_t {
    to_native(&FakeValue::Text(s.as_bytes().to_vec()))
}

pub fn api() -> &'static Api {
    static API: OnceLock<Api> = OnceLock::new();
    API.get_or_init(|| Api {
        libsql_error_message: error_message,
        libsql_error_deinit: error_deinit,
        libsql_database_init: database_init,
        libsql_database_sync: database_sync,
        libsql_database_connect: database_connect,
        libsql_database_deinit: database_deinit,
        libsql_connection_transaction: connection_transaction,
        libsql_connection_batch: connection_batch,
        libsql_connection_prepare: connection_prepare,
        libsql_connection_deinit: connection_deinit,
        libsql_transaction_batch: transaction_batch,
        libsql_transaction_commit: transaction_commit,
        libsql_transaction_rollback: transaction_rollback,
        libsql_statement_bind_value: statement_bind_value,
        libsql_statement_bind_named: statement_bind_named,
        libsql_statement_execute: statement_execute,
        libsql_statement_query: statement_query,
        libsql_statement_deinit: statement_deinit,
        libsql_rows_next: rows_next,
        libsql_rows_column_name: rows_column_name,
        libsql_rows_column_length: rows_column_length,
        libsql_rows_deinit: rows_deinit,
        libsql_row_value: row_value,
        libsql_row_empty: row_empty,
        libsql_row_deinit: row_deinit,
        libsql_integer: integer,
        libsql_real: real,
        libsql_text: text,
        libsql_blob: blob,
        libsql_null: null,
        libsql_slice_deinit: slice_deinit,
    })
}

// ---------------------------- helpers ----------------------------

struct FakeError(CString);
struct FakeDb;
struct FakeConn;
struct FakeTx;
struct FakeStmt {
    binds: Vec<Bind>,
}
struct FakeRows {
    columns: Vec<String>,
    rows: VecDeque<Vec<FakeValue>>,
}

fn failure(call: &'static str) -> *mut libsql_error_t {
    match with(|s| s.failures.remove(call)) {
        Some(msg) => new_error(&msg),
        None => std::ptr::null_mut(),
    }
}

fn new_error(msg: &str) -> *mut libsql_error_t {
    let msg = CString::new(msg).unwrap_or_default();
    Box::into_raw(Box::new(FakeError(msg))) as *mut libsql_error_t
}

fn boxed<T>(v: T) -> *mut c_void {
    Box::into_raw(Box::new(v)) as *mut c_void
}

unsafe fn unbox<T>(p: *mut c_void) {
    drop(Box::from_raw(p as *mut T));
}

unsafe fn get<'a, T>(p: *mut c_void) -> &'a mut T {
    &mut *(p as *mut T)
}

unsafe fn opt_string(p: *const c_char) -> Option<String> {
    (!p.is_null()).then(|| CStr::from_ptr(p).to_string_lossy().into_owned())
}

fn slice_of(bytes: Vec<u8>) -> libsql_slice_t {
    let b = bytes.into_boxed_slice();
    let len = b.len();
    libsql_slice_t {
        ptr: Box::into_raw(b) as *mut u8 as *const c_void,
        len,
    }
}

unsafe fn bytes_of(s: libsql_slice_t) -> Vec<u8> {
    if s.ptr.is_null() || s.len == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(s.ptr as *const u8, s.len).to_vec()
    }
}

unsafe fn to_fake(v: libsql_value_t) -> FakeValue {
    match v.type_ {
        LIBSQL_TYPE_INTEGER => FakeValue::Integer(v.value.integer),
        LIBSQL_TYPE_REAL => FakeValue::Real(v.value.real),
        LIBSQL_TYPE_TEXT => FakeValue::Text(bytes_of(v.value.text)),
        LIBSQL_TYPE_BLOB => FakeValue::Blob(bytes_of(v.value.blob)),
        _ => FakeValue::Null,
    }
}

fn to_native(v: &FakeValue) -> libsql_value_t {
    match v {
        FakeValue::Integer(i) => value(libsql_value_union_t { integer: *i }, LIBSQL_TYPE_INTEGER),
        FakeValue::Real(f) => value(libsql_value_union_t { real: *f }, LIBSQL_TYPE_REAL),
        FakeValue::Text(b) => value(
            libsql_value_union_t {
                text: slice_of(b.clone()),
            },
            LIBSQL_TYPE_TEXT,
        ),
        FakeValue::Blob(b) => value(
            libsql_value_union_t {
                blob: slice_of(b.clone()),
            },
            LIBSQL_TYPE_BLOB,
        ),
        FakeValue::Null => value(libsql_value_union_t { integer: 0 }, LIBSQL_TYPE_NULL),
    }
}

fn value(value: libsql_value_union_t, type_: libsql_type_t) -> libsql_value_t {
    libsql_value_t { value, type_ }
}

fn null_value() -> libsql_value_t {
    value(libsql_value_union_t { integer: 0 }, LIBSQL_TYPE_NULL)
}

// ---------------------------- ABI ----------------------------

unsafe extern "C" fn error_message(e: *mut libsql_error_t) -> *const c_char {
    (*(e as *mut FakeError)).0.as_ptr()
}

unsafe extern "C" fn error_deinit(e: *mut libsql_error_t) {
    drop(Box::from_raw(e as *mut FakeError));
    with(|s| s.counters.error_deinit += 1);
}

unsafe extern "C" fn database_init(desc: libsql_database_desc_t) -> libsql_database_t {
    let snapshot = DescSnapshot {
        url: opt_string(desc.url),
        path: opt_string(desc.path),
        auth_token: opt_string(desc.auth_token),
        encryption_key: opt_string(desc.encryption_key),
        sync_interval: desc.sync_interval,
        not_read_your_writes: desc.not_read_your_writes,
        webpki: desc.webpki,
    };
    with(|s| s.desc = Some(snapshot));

    let err = failure("database_init");
    if !err.is_null() {
        return libsql_database_t {
            err,
            inner: std::ptr::null_mut(),
        };
    }
    libsql_database_t {
        err,
        inner: boxed(FakeDb),
    }
}

unsafe extern "C" fn database_sync(_db: libsql_database_t) -> libsql_sync_t {
    let (frame_no, frames_synced) = with(|s| {
        s.counters.sync += 1;
        s.sync
    });
    libsql_sync_t {
        err: failure("database_sync"),
        frame_no,
        frames_synced,
    }
}

unsafe extern "C" fn database_connect(_db: libsql_database_t) -> libsql_connection_t {
    with(|s| s.counters.connect += 1);
    let err = failure("database_connect");
    let inner = if err.is_null() {
        boxed(FakeConn)
    } else {
        std::ptr::null_mut()
    };
    libsql_connection_t { err, inner }
}

unsafe extern "C" fn database_deinit(db: libsql_database_t) {
    unbox::<FakeDb>(db.inner);
    with(|s| s.counters.database_deinit += 1);
}

unsafe extern "C" fn connection_transaction(_conn: libsql_connection_t) -> libsql_transaction_t {
    with(|s| s.counters.transaction_begin += 1);
    let err = failure("connection_transaction");
    let inner = if err.is_null() {
        boxed(FakeTx)
    } else {
        std::ptr::null_mut()
    };
    libsql_transaction_t { err, inner }
}

unsafe fn record_batch(sql: *const c_char, target: &'static str) -> libsql_batch_t {
    let err = failure("batch");
    if err.is_null() {
        let sql = opt_string(sql).unwrap_or_default();
        with(|s| s.batches.push((sql, target)));
    }
    libsql_batch_t { err }
}

unsafe extern "C" fn connection_batch(
    _conn: libsql_connection_t,
    sql: *const c_char,
) -> libsql_batch_t {
    record_batch(sql, "connection")
}

unsafe extern "C" fn transaction_batch(
    _tx: libsql_transaction_t,
    sql: *const c_char,
) -> libsql_batch_t {
    record_batch(sql, "transaction")
}

unsafe extern "C" fn connection_prepare(
    _conn: libsql_connection_t,
    _sql: *const c_char,
) -> libsql_statement_t {
    let err = failure("prepare");
    let inner = if err.is_null() {
        boxed(FakeStmt { binds: Vec::new() })
    } else {
        std::ptr::null_mut()
    };
    libsql_statement_t { err, inner }
}

unsafe extern "C" fn connection_deinit(conn: libsql_connection_t) {
    unbox::<FakeConn>(conn.inner);
    with(|s| s.counters.connection_deinit += 1);
}

unsafe extern "C" fn transaction_commit(tx: libsql_transaction_t) {
    unbox::<FakeTx>(tx.inner);
    with(|s| s.counters.commit += 1);
}

unsafe extern "C" fn transaction_rollback(tx: libsql_transaction_t) {
    unbox::<FakeTx>(tx.inner);
    with(|s| s.counters.rollback += 1);
}

unsafe extern "C" fn statement_bind_value(
    stmt: libsql_statement_t,
    v: libsql_value_t,
) -> libsql_bind_t {
    let err = failure("bind");
    if err.is_null() {
        get::<FakeStmt>(stmt.inner).binds.push((None, to_fake(v)));
    }
    libsql_bind_t { err }
}

unsafe extern "C" fn statement_bind_named(
    stmt: libsql_statement_t,
    name: *const c_char,
    v: libsql_value_t,
) -> libsql_bind_t {
    let err = failure("bind");
    if err.is_null() {
        get::<FakeStmt>(stmt.inner)
            .binds
            .push((opt_string(name), to_fake(v)));
    }
    libsql_bind_t { err }
}

unsafe extern "C" fn statement_execute(stmt: libsql_statement_t) -> libsql_execute_t {
    let binds = get::<FakeStmt>(stmt.inner).binds.clone();
    let rows_changed = with(|s| {
        s.counters.execute += 1;
        s.last_binds = binds;
        s.rows_changed
    });
    libsql_execute_t {
        err: failure("execute"),
        rows_changed,
    }
}

unsafe extern "C" fn statement_query(stmt: libsql_statement_t) -> libsql_rows_t {
    let err = failure("query");
    if !err.is_null() {
        return libsql_rows_t {
            err,
            inner: std::ptr::null_mut(),
        };
    }

    let binds = get::<FakeStmt>(stmt.inner).binds.clone();
    let queued = with(|s| {
        s.last_binds = binds.clone();
        s.queued.take()
    });
    let (columns, rows) = queued.unwrap_or_else(|| {
        let columns = binds
            .iter()
            .enumerate()
            .map(|(i, (name, _))| name.clone().unwrap_or_else(|| format!("?{}", i + 1)))
            .collect();
        let row = binds.into_iter().map(|(_, v)| v).collect();
        (columns, vec![row])
    });

    libsql_rows_t {
        err,
        inner: boxed(FakeRows {
            columns,
            rows: rows.into(),
        }),
    }
}

unsafe extern "C" fn statement_deinit(stmt: libsql_statement_t) {
    unbox::<FakeStmt>(stmt.inner);
    with(|s| s.counters.statement_deinit += 1);
}

unsafe extern "C" fn rows_next(rows: libsql_rows_t) -> libsql_row_t {
    let err = failure("rows_next");
    if !err.is_null() {
        return libsql_row_t {
            err,
            inner: std::ptr::null_mut(),
        };
    }
    let inner = match get::<FakeRows>(rows.inner).rows.pop_front() {
        Some(row) => boxed(row),
        None => std::ptr::null_mut(),
    };
    libsql_row_t { err, inner }
}

unsafe extern "C" fn rows_column_name(rows: libsql_rows_t, idx: i32) -> libsql_slice_t {
    let name = usize::try_from(idx)
        .ok()
        .and_then(|i| get::<FakeRows>(rows.inner).columns.get(i).cloned())
        .unwrap_or_default();
    slice_of(name.into_bytes())
}

unsafe extern "C" fn rows_column_length(rows: libsql_rows_t) -> i32 {
    get::<FakeRows>(rows.inner).columns.len() as i32
}

unsafe extern "C" fn rows_deinit(rows: libsql_rows_t) {
    unbox::<FakeRows>(rows.inner);
    with(|s| s.counters.rows_deinit += 1);
}

unsafe extern "C" fn row_value(row: libsql_row_t, idx: i32) -> libsql_result_value_t {
    let cell = usize::try_from(idx)
        .ok()
        .and_then(|i| get::<Vec<FakeValue>>(row.inner).get(i).cloned());
    match cell {
        Some(v) => libsql_result_value_t {
            err: std::ptr::null_mut(),
            ok: to_native(&v),
        },
        None => libsql_result_value_t {
            err: new_error("column index out of range"),
            ok: null_value(),
        },
    }
}

unsafe extern "C" fn row_empty(row: libsql_row_t) -> bool {
    row.inner.is_null()
}

unsafe extern "C" fn row_deinit(row: libsql_row_t) {
    unbox::<Vec<FakeValue>>(row.inner);
    with(|s| s.counters.row_deinit += 1);
}

unsafe extern "C" fn integer(i: i64) -> libsql_value_t {
    value(libsql_value_union_t { integer: i }, LIBSQL_TYPE_INTEGER)
}

unsafe extern "C" fn real(f: f64) -> libsql_value_t {
    value(libsql_value_union_t { real: f }, LIBSQL_TYPE_REAL)
}

unsafe extern "C" fn text(ptr: *const c_char, len: usize) -> libsql_value_t {
    value(
        libsql_value_union_t {
            text: libsql_slice_t {
                ptr: ptr as *const c_void,
                len,
            },
        },
        LIBSQL_TYPE_TEXT,
    )
}

unsafe extern "C" fn blob(ptr: *const u8, len: usize) -> libsql_value_t {
    value(
        libsql_value_union_t {
            blob: libsql_slice_t {
                ptr: ptr as *const c_void,
                len,
            },
        },
        LIBSQL_TYPE_BLOB,
    )
}

unsafe extern "C" fn null() -> libsql_value_t {
    null_value()
}

unsafe extern "C" fn slice_deinit(s: libsql_slice_t) {
    if !s.ptr.is_null() {
        drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
            s.ptr as *mut u8,
            s.len,
        )));
    }
    with(|st| st.counters.slice_deinit += 1);
}
