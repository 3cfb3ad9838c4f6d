use std::{
    ffi::CString,
    marker::PhantomData,
    os::raw::c_char,
    rc::Rc,
    sync::atomic::{AtomicBool, Ordering},
};

use tracing::{debug, warn};

use crate::{
    api::Api,
    config::{ConnectorOptions, ReplicaBuilder, ReplicaOption},
    connection::Connection,
    error::check,
    runtime,
    sys as ffi,
    value::TimestampDecoding,
    Error, Result,
};

/// Replication progress reported by [`Connector::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replicated {
    pub frame_no: u64,
    pub frames_synced: u64,
}

/// An open database: in-memory, local file, remote, or embedded replica.
///
/// Connections obtained from it are independent native handles and may outlive it.
pub struct Connector {
    api: &'static Api,
    db: Option<ffi::libsql_database_t>,
    timestamps: TimestampDecoding,
    // native handles are single-threaded: keep the wrapper !Send + !Sync
    _nosend: PhantomData<Rc<()>>,
}

impl Connector {
    /// Open a database, loading the native runtime on first use.
    pub fn new(options: ConnectorOptions) -> Result<Self> {
        Self::with_api(runtime::api()?, options)
    }

    /// Open an embedded replica from a list of options, applied in order.
    ///
    /// All option violations are reported together; see [`ReplicaBuilder`].
    pub fn embedded_replica(
        path: &str,
        primary_url: &str,
        options: impl IntoIterator<Item = ReplicaOption>,
    ) -> Result<Self> {
        let options = options
            .into_iter()
            .fold(ReplicaBuilder::new(path, primary_url), ReplicaBuilder::apply)
            .build()?;
        Self::new(options)
    }

    pub(crate) fn with_api(api: &'static Api, options: ConnectorOptions) -> Result<Self> {
        let path = optional_cstring(options.path(), "path")?;
        let url = optional_cstring(options.url(), "url")?;
        let auth_token = optional_cstring(options.auth_token(), "auth token")?;

        if !options.encryption_key().is_empty() {
            warn!("encryption key is not supported by the native layer yet; opening without encryption");
        }

        let desc = ffi::libsql_database_desc_t {
            url: as_ptr(&url),
            path: as_ptr(&path),
            auth_token: as_ptr(&auth_token),
            encryption_key: std::ptr::null(),
            sync_interval: options.sync_interval_millis(),
            not_read_your_writes: !options.read_your_writes(),
            webpki: options.use_webpki(),
        };

        let db = unsafe { (api.libsql_database_init)(desc) };
        check(api, db.err)?;
        debug!(kind = ?options.kind(), path = options.path(), url = options.url(), "opened database");

        Ok(Self {
            api,
            db: Some(db),
            timestamps: options.timestamp_decoding(),
            _nosend: PhantomData,
        })
    }

    fn raw(&self) -> Result<ffi::libsql_database_t> {
        self.db.ok_or(Error::Closed("database"))
    }

    /// Pull new frames from the primary. Only meaningful for embedded replicas; the engine
    /// decides what happens for other kinds.
    pub fn sync(&self) -> Result<Replicated> {
        let db = self.raw()?;
        let sync = unsafe { (self.api.libsql_database_sync)(db) };
        check(self.api, sync.err)?;
        debug!(
            frame_no = sync.frame_no,
            frames_synced = sync.frames_synced,
            "synced replica"
        );
        Ok(Replicated {
            frame_no: sync.frame_no,
            frames_synced: sync.frames_synced,
        })
    }

    pub fn connect(&self) -> Result<Connection> {
        let db = self.raw()?;
        let conn = unsafe { (self.api.libsql_database_connect)(db) };
        check(self.api, conn.err)?;
        debug!("opened connection");
        Ok(Connection::from_raw(self.api, conn, self.timestamps))
    }

    /// Like [`connect`](Self::connect), but gives up with [`Error::Cancelled`] if `cancelled`
    /// is already set. The native call itself cannot be interrupted.
    pub fn connect_cancellable(&self, cancelled: &AtomicBool) -> Result<Connection> {
        if cancelled.load(Ordering::Acquire) {
            return Err(Error::Cancelled);
        }
        self.connect()
    }

    pub fn is_closed(&self) -> bool {
        self.db.is_none()
    }

    /// Release the native database. Later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(db) = self.db.take() {
            unsafe { (self.api.libsql_database_deinit)(db) };
            debug!("closed database");
        }
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        self.close();
    }
}

/// Empty strings are passed to the engine as null ("unset").
fn optional_cstring(s: &str, what: &'static str) -> Result<Option<CString>> {
    if s.is_empty() {
        return Ok(None);
    }
    CString::new(s).map(Some).map_err(|_| Error::Nul(what))
}

fn as_ptr(s: &Option<CString>) -> *const c_char {
    s.as_ref().map_or(std::ptr::null(), |c| c.as_ptr())
}
