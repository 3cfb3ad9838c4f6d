use std::{ffi::CString, marker::PhantomData, rc::Rc};

use crate::{
    api::Api,
    connection::Connection,
    error::check,
    sys as ffi,
    value::{self, NamedValue, TimestampDecoding, Value},
    Error, Result,
};

/// Outcome of [`Statement::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
}

// -------------------------- Statement --------------------------

/// A prepared statement. Arguments bind in the order given; positional arguments are never
/// reordered.
pub struct Statement<'c> {
    api: &'static Api,
    stmt: Option<ffi::libsql_statement_t>,
    timestamps: TimestampDecoding,
    _conn: PhantomData<&'c Connection>,
    _nosend: PhantomData<Rc<()>>,
}

impl<'c> Statement<'c> {
    pub(crate) fn from_raw(
        api: &'static Api,
        stmt: ffi::libsql_statement_t,
        timestamps: TimestampDecoding,
    ) -> Self {
        Self {
            api,
            stmt: Some(stmt),
            timestamps,
            _conn: PhantomData,
            _nosend: PhantomData,
        }
    }

    fn raw(&self) -> Result<ffi::libsql_statement_t> {
        self.stmt.ok_or(Error::Closed("statement"))
    }

    /// Text decoding mode for rows returned by later queries.
    pub fn set_timestamp_decoding(&mut self, mode: TimestampDecoding) {
        self.timestamps = mode;
    }

    /// Bind each argument by name when it has one, otherwise by position. Stops at the first
    /// failure.
    pub fn bind(&mut self, args: &[NamedValue]) -> Result<()> {
        self.bind_all(args.iter().map(|a| (a.name.as_deref(), &a.value)))
    }

    fn bind_all<'a>(
        &mut self,
        args: impl IntoIterator<Item = (Option<&'a str>, &'a Value)>,
    ) -> Result<()> {
        let stmt = self.raw()?;
        for (name, v) in args {
            let encoded = value::encode(self.api, v);
            let bind = match name {
                Some(name) => {
                    let cname = CString::new(name).map_err(|_| Error::Nul("parameter name"))?;
                    unsafe {
                        (self.api.libsql_statement_bind_named)(stmt, cname.as_ptr(), encoded.raw)
                    }
                }
                None => unsafe { (self.api.libsql_statement_bind_value)(stmt, encoded.raw) },
            };
            check(self.api, bind.err)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, params: &[Value]) -> Result<ExecResult> {
        self.bind_all(params.iter().map(|v| (None, v)))?;
        self.run_execute()
    }

    pub fn execute_named(&mut self, args: &[NamedValue]) -> Result<ExecResult> {
        self.bind(args)?;
        self.run_execute()
    }

    fn run_execute(&mut self) -> Result<ExecResult> {
        let stmt = self.raw()?;
        let exec = unsafe { (self.api.libsql_statement_execute)(stmt) };
        check(self.api, exec.err)?;
        Ok(ExecResult {
            rows_affected: exec.rows_changed,
        })
    }

    pub fn query(&mut self, params: &[Value]) -> Result<Rows<'_>> {
        self.bind_all(params.iter().map(|v| (None, v)))?;
        self.run_query()
    }

    pub fn query_named(&mut self, args: &[NamedValue]) -> Result<Rows<'_>> {
        self.bind(args)?;
        self.run_query()
    }

    fn run_query(&mut self) -> Result<Rows<'_>> {
        let stmt = self.raw()?;
        let rows = unsafe { (self.api.libsql_statement_query)(stmt) };
        check(self.api, rows.err)?;
        Ok(Rows {
            api: self.api,
            rows: Some(rows),
            timestamps: self.timestamps,
            _stmt: PhantomData,
            _nosend: PhantomData,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.stmt.is_none()
    }

    /// Release the native statement. Later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(stmt) = self.stmt.take() {
            unsafe { (self.api.libsql_statement_deinit)(stmt) };
        }
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

// -------------------------- Rows --------------------------

/// Result cursor of [`Statement::query`].
///
/// Iterating yields one `Vec<Value>` per row, sized to the column count.
pub struct Rows<'s> {
    api: &'static Api,
    rows: Option<ffi::libsql_rows_t>,
    timestamps: TimestampDecoding,
    _stmt: PhantomData<&'s mut ()>,
    _nosend: PhantomData<Rc<()>>,
}

impl Rows<'_> {
    pub fn set_timestamp_decoding(&mut self, mode: TimestampDecoding) {
        self.timestamps = mode;
    }

    pub fn column_count(&self) -> Result<usize> {
        let rows = self.rows.ok_or(Error::Closed("rows"))?;
        let n = unsafe { (self.api.libsql_rows_column_length)(rows) };
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Column names in cursor order.
    pub fn columns(&self) -> Result<Vec<String>> {
        let rows = self.rows.ok_or(Error::Closed("rows"))?;
        let n = unsafe { (self.api.libsql_rows_column_length)(rows) };
        (0..n.max(0))
            .map(|i| unsafe {
                let name = (self.api.libsql_rows_column_name)(rows, i);
                Ok(value::take_text(self.api, name))
            })
            .collect()
    }

    /// Advance the cursor and decode the row into `dest`, one slot per column.
    ///
    /// Returns `Ok(false)` at the end of the rows (and on closed rows). Slots past the row's
    /// width are an engine error.
    pub fn next_into(&mut self, dest: &mut [Value]) -> Result<bool> {
        let Some(rows) = self.rows else {
            return Ok(false);
        };

        let row = unsafe { (self.api.libsql_rows_next)(rows) };
        check(self.api, row.err)?;
        if unsafe { (self.api.libsql_row_empty)(row) } {
            return Ok(false);
        }

        let filled = self.fill(row, dest);
        unsafe { (self.api.libsql_row_deinit)(row) };
        filled.map(|()| true)
    }

    fn fill(&self, row: ffi::libsql_row_t, dest: &mut [Value]) -> Result<()> {
        for (i, slot) in dest.iter_mut().enumerate() {
            let idx = i32::try_from(i)
                .map_err(|_| Error::native(format!("column index {i} out of range")))?;
            let v = unsafe { (self.api.libsql_row_value)(row, idx) };
            check(self.api, v.err)?;
            *slot = unsafe { value::decode(self.api, v.ok, self.timestamps) };
        }
        Ok(())
    }

    /// Next row as an owned vector, or `None` at the end.
    pub fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        if self.rows.is_none() {
            return Ok(None);
        }
        let mut buf = vec![Value::Null; self.column_count()?];
        Ok(self.next_into(&mut buf)?.then_some(buf))
    }

    /// Release the native cursor. Later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(rows) = self.rows.take() {
            unsafe { (self.api.libsql_rows_deinit)(rows) };
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

impl Drop for Rows<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
