use std::{cell::Cell, ffi::CString, fmt, marker::PhantomData, rc::Rc};

use tracing::{debug, warn};

use crate::{
    api::Api,
    error::check,
    statement::Statement,
    sys as ffi,
    value::TimestampDecoding,
    Error, Result,
};

/// Run a multi-statement SQL script in one call.
///
/// Not part of the prepare/execute surface; reach it through the concrete
/// [`Connection`] or [`Transaction`].
pub trait Batchable {
    fn batch(&self, sql: &str) -> Result<()>;
}

/// Transaction isolation levels a caller may ask for. Only [`IsolationLevel::Default`] is
/// supported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    WriteCommitted,
    RepeatableRead,
    Snapshot,
    Serializable,
    Linearizable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsolationLevel::Default => "Default",
            IsolationLevel::ReadUncommitted => "Read Uncommitted",
            IsolationLevel::ReadCommitted => "Read Committed",
            IsolationLevel::WriteCommitted => "Write Committed",
            IsolationLevel::RepeatableRead => "Repeatable Read",
            IsolationLevel::Snapshot => "Snapshot",
            IsolationLevel::Serializable => "Serializable",
            IsolationLevel::Linearizable => "Linearizable",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

// -------------------------- Connection --------------------------

/// A native connection, optionally inside one transaction.
pub struct Connection {
    api: &'static Api,
    conn: Option<ffi::libsql_connection_t>,
    // Some(..) while a transaction is open; the connection owns it.
    tx: Cell<Option<ffi::libsql_transaction_t>>,
    timestamps: TimestampDecoding,
    _nosend: PhantomData<Rc<()>>,
}

impl Connection {
    pub(crate) fn from_raw(
        api: &'static Api,
        conn: ffi::libsql_connection_t,
        timestamps: TimestampDecoding,
    ) -> Self {
        Self {
            api,
            conn: Some(conn),
            tx: Cell::new(None),
            timestamps,
            _nosend: PhantomData,
        }
    }

    fn raw(&self) -> Result<ffi::libsql_connection_t> {
        self.conn.ok_or(Error::Closed("connection"))
    }

    /// Text decoding mode inherited by statements prepared after this call.
    pub fn set_timestamp_decoding(&mut self, mode: TimestampDecoding) {
        self.timestamps = mode;
    }

    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        let conn = self.raw()?;
        let csql = CString::new(sql).map_err(|_| Error::Nul("sql"))?;
        let stmt = unsafe { (self.api.libsql_connection_prepare)(conn, csql.as_ptr()) };
        check(self.api, stmt.err)?;
        debug!(sql, "prepared statement");
        Ok(Statement::from_raw(self.api, stmt, self.timestamps))
    }

    /// Begin a read-write transaction with the default isolation level.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        self.begin_with(TxOptions::default())
    }

    /// # Errors
    ///
    /// Read-only requests, non-default isolation levels, and nested transactions are rejected
    /// without calling into the engine.
    pub fn begin_with(&self, options: TxOptions) -> Result<Transaction<'_>> {
        if options.read_only {
            return Err(Error::ReadOnlyTransaction);
        }
        if options.isolation != IsolationLevel::Default {
            return Err(Error::UnsupportedIsolation(options.isolation));
        }
        let conn = self.raw()?;
        if self.in_transaction() {
            return Err(Error::NestedTransaction);
        }

        let tx = unsafe { (self.api.libsql_connection_transaction)(conn) };
        check(self.api, tx.err)?;
        self.tx.set(Some(tx));
        debug!("began transaction");
        Ok(Transaction { conn: self })
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.get().is_some()
    }

    /// Handle to the open transaction, if any.
    pub fn transaction(&self) -> Option<Transaction<'_>> {
        self.in_transaction().then_some(Transaction { conn: self })
    }

    fn finish(&self, commit: bool) -> Result<()> {
        let tx = self.tx.get().ok_or(Error::NotInTransaction)?;
        // Both calls consume the native transaction.
        unsafe {
            if commit {
                (self.api.libsql_transaction_commit)(tx);
            } else {
                (self.api.libsql_transaction_rollback)(tx);
            }
        }
        self.tx.set(None);
        debug!(commit, "finished transaction");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Release the native connection. Later calls are no-ops.
    ///
    /// An open transaction is neither committed nor rolled back; its outcome is left to the
    /// engine.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.tx.take().is_some() {
                warn!("closing connection with an open transaction");
            }
            unsafe { (self.api.libsql_connection_deinit)(conn) };
            debug!("closed connection");
        }
    }
}

impl Batchable for Connection {
    /// Runs inside the open transaction when there is one.
    fn batch(&self, sql: &str) -> Result<()> {
        let conn = self.raw()?;
        let csql = CString::new(sql).map_err(|_| Error::Nul("sql"))?;
        let batch = unsafe {
            match self.tx.get() {
                Some(tx) => (self.api.libsql_transaction_batch)(tx, csql.as_ptr()),
                None => (self.api.libsql_connection_batch)(conn, csql.as_ptr()),
            }
        };
        check(self.api, batch.err)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

// -------------------------- Transactions --------------------------

/// The open transaction of a [`Connection`].
///
/// Dropping it does nothing: the transaction stays open on the connection and can be picked up
/// again with [`Connection::transaction`].
#[derive(Clone)]
pub struct Transaction<'c> {
    conn: &'c Connection,
}

impl<'c> Transaction<'c> {
    /// # Errors
    ///
    /// [`Error::NotInTransaction`] if the transaction was already committed or rolled back.
    pub fn commit(&self) -> Result<()> {
        self.conn.finish(true)
    }

    /// # Errors
    ///
    /// [`Error::NotInTransaction`] if the transaction was already committed or rolled back.
    pub fn rollback(&self) -> Result<()> {
        self.conn.finish(false)
    }

    pub fn prepare(&self, sql: &str) -> Result<Statement<'c>> {
        self.conn.prepare(sql)
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }
}

impl Batchable for Transaction<'_> {
    fn batch(&self, sql: &str) -> Result<()> {
        self.conn.batch(sql)
    }
}
