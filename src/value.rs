//! Conversion between Rust values and the engine's tagged `libsql_value_t`.
//!
//! Text read back from the engine is, by default, re-parsed as a timestamp when it matches one of
//! a fixed list of date/time layouts. This is a guess with no schema behind it: a text column
//! holding something like `"2024-05-01"` comes back as [`Value::Timestamp`]. Use
//! [`TimestampDecoding::Disabled`] wherever text must stay text.

use std::os::raw::c_char;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::api::Api;
use crate::sys::*;

/// A value passed to or read from the engine.
///
/// `Bool` exists for binding only; the engine has no boolean type and stores it as integer 0/1,
/// so it reads back as [`Value::Integer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(i64::from(v))
            }
        })*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A bind argument: by name when `name` is set, otherwise by position.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: Option<String>,
    pub value: Value,
}

impl NamedValue {
    pub fn positional(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    /// The name is passed to the engine verbatim, so include the placeholder prefix
    /// (`:id`, `@id`, `$id`) the SQL uses.
    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }
}

/// How text read from the engine is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampDecoding {
    /// Text matching a known date/time layout becomes [`Value::Timestamp`].
    #[default]
    Heuristic,
    /// Text is always [`Value::Text`].
    Disabled,
}

// Tried in order; first match wins.
const OFFSET_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"];
const NAIVE_LAYOUTS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_LAYOUT: &str = "%Y-%m-%d";

/// Parse `s` against the recognized date/time layouts. A trailing `Z` is ignored and layouts
/// without an offset are read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.strip_suffix('Z').unwrap_or(s);
    if !has_timestamp_shape(s.as_bytes()) {
        return None;
    }

    for layout in OFFSET_LAYOUTS {
        if let Ok(t) = DateTime::parse_from_str(s, layout) {
            return Some(t.with_timezone(&Utc));
        }
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, DATE_LAYOUT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Fixed-width prefix shared by every layout: `DDDD-DD-DD`, then either nothing or
/// `[ T]DD:DD` optionally followed by `:DD`. chrono alone would also take short fields, a sign,
/// leading whitespace, or a missing separator.
fn has_timestamp_shape(b: &[u8]) -> bool {
    fn matches(b: &[u8], pattern: &[u8]) -> bool {
        b.len() >= pattern.len()
            && b.iter().zip(pattern).all(|(c, p)| match p {
                b'D' => c.is_ascii_digit(),
                b'S' => *c == b' ' || *c == b'T',
                _ => c == p,
            })
    }

    if !matches(b, b"DDDD-DD-DD") {
        return false;
    }
    if b.len() == 10 {
        return true;
    }
    if !matches(b, b"DDDD-DD-DDSDD:DD") {
        return false;
    }
    b.len() == 16 || matches(b, b"DDDD-DD-DDSDD:DD:DD")
}

/// RFC 3339 with fractional seconds when present and a `Z` suffix.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// A native value plus the buffer its text/blob payload points into.
///
/// The buffer must stay alive until the bind call that consumes `raw` returns.
pub(crate) struct Encoded {
    pub(crate) raw: libsql_value_t,
    _buf: Vec<u8>,
}

pub(crate) fn encode(api: &Api, value: &Value) -> Encoded {
    match value {
        Value::Null => scalar(unsafe { (api.libsql_null)() }),
        Value::Bool(b) => scalar(unsafe { (api.libsql_integer)(i64::from(*b)) }),
        Value::Integer(i) => scalar(unsafe { (api.libsql_integer)(*i) }),
        Value::Real(f) => scalar(unsafe { (api.libsql_real)(*f) }),
        Value::Text(s) => text(api, s),
        Value::Timestamp(t) => text(api, &format_timestamp(t)),
        Value::Blob(b) => {
            let buf = b.clone();
            let raw = unsafe { (api.libsql_blob)(buf.as_ptr(), buf.len()) };
            Encoded { raw, _buf: buf }
        }
    }
}

fn scalar(raw: libsql_value_t) -> Encoded {
    Encoded {
        raw,
        _buf: Vec::new(),
    }
}

fn text(api: &Api, s: &str) -> Encoded {
    // NUL-terminated for readers that treat the pointer as a C string; the
    // length excludes the terminator.
    let mut buf = Vec::with_capacity(s.len() + 1);
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    let raw = unsafe { (api.libsql_text)(buf.as_ptr() as *const c_char, s.len()) };
    Encoded { raw, _buf: buf }
}

/// Decode a value read from a row, releasing any engine-owned slice it carries.
///
/// # Safety
///
/// `v` must come from `libsql_row_value` on `api` and must not be decoded twice.
///
/// # Panics
///
/// Panics on a type tag outside the engine's value enum.
pub(crate) unsafe fn decode(api: &Api, v: libsql_value_t, mode: TimestampDecoding) -> Value {
    match v.type_ {
        LIBSQL_TYPE_INTEGER => Value::Integer(v.value.integer),
        LIBSQL_TYPE_REAL => Value::Real(v.value.real),
        LIBSQL_TYPE_TEXT => {
            let s = take_text(api, v.value.text);
            if mode == TimestampDecoding::Heuristic {
                if let Some(t) = parse_timestamp(&s) {
                    return Value::Timestamp(t);
                }
            }
            Value::Text(s)
        }
        LIBSQL_TYPE_BLOB => Value::Blob(take_slice(api, v.value.blob)),
        LIBSQL_TYPE_NULL => Value::Null,
        other => panic!("libsql returned unknown value type tag {other}"),
    }
}

/// Copy an engine slice into owned memory and release it.
///
/// # Safety
///
/// `s` must be an unreleased slice returned by `api`.
pub(crate) unsafe fn take_slice(api: &Api, s: libsql_slice_t) -> Vec<u8> {
    let out = if s.ptr.is_null() || s.len == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(s.ptr as *const u8, s.len).to_vec()
    };
    (api.libsql_slice_deinit)(s);
    out
}

/// Like [`take_slice`], read as a C string: stops at the first NUL, invalid UTF-8 is replaced.
///
/// # Safety
///
/// Same as [`take_slice`].
pub(crate) unsafe fn take_text(api: &Api, s: libsql_slice_t) -> String {
    let mut bytes = take_slice(api, s);
    if let Some(nul) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(nul);
    }
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
