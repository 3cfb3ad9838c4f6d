//! Connector configuration: connection-string parsing and the embedded-replica builder.

use std::time::Duration;

use crate::error::{OptionError, OptionErrors};
use crate::value::TimestampDecoding;
use crate::{Error, Result};

/// Everything needed to open a database. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorOptions {
    url: String,
    path: String,
    auth_token: String,
    encryption_key: String,
    sync_interval_millis: u64,
    use_webpki: bool,
    not_read_your_writes: bool,
    timestamps: TimestampDecoding,
}

/// Where the database lives, derived from which of url/path are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Memory,
    Local,
    Remote,
    EmbeddedReplica,
}

impl ConnectorOptions {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn local(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// `url` is forwarded to the engine as given.
    pub fn remote(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
            ..Self::default()
        }
    }

    /// Parse a connection string.
    ///
    /// | form | result |
    /// |------|--------|
    /// | `:memory:` | in-memory database |
    /// | `file:<path>`, `file:///<path>` | local file |
    /// | `libsql://host?authToken=..` | remote |
    /// | `libsql://host?authToken=..&path=..` | embedded replica of `host` stored at `path` |
    ///
    /// `http://` and `https://` behave like `libsql://`; the host is always forwarded as
    /// `libsql://<host>`. Userinfo is dropped but a port is kept (`libsql://127.0.0.1:8080`),
    /// where hostname-only forwarding would lose it.
    pub fn from_dsn(dsn: &str) -> Result<Self> {
        let dsn = dsn.trim();
        if dsn == ":memory:" {
            return Ok(Self::memory());
        }

        let (scheme, rest) = split_scheme(dsn)?;
        match scheme.to_ascii_lowercase().as_str() {
            "file" => Ok(Self::local(file_path(rest)?)),
            "http" | "https" | "libsql" => remote_options(rest),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }

    /// Same options with a different text decoding mode.
    pub fn with_timestamp_decoding(mut self, mode: TimestampDecoding) -> Self {
        self.timestamps = mode;
        self
    }

    pub fn kind(&self) -> DatabaseKind {
        match (self.url.is_empty(), self.path.is_empty()) {
            (true, true) => DatabaseKind::Memory,
            (true, false) => DatabaseKind::Local,
            (false, true) => DatabaseKind::Remote,
            (false, false) => DatabaseKind::EmbeddedReplica,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn encryption_key(&self) -> &str {
        &self.encryption_key
    }

    pub fn sync_interval_millis(&self) -> u64 {
        self.sync_interval_millis
    }

    pub fn use_webpki(&self) -> bool {
        self.use_webpki
    }

    pub fn read_your_writes(&self) -> bool {
        !self.not_read_your_writes
    }

    pub fn timestamp_decoding(&self) -> TimestampDecoding {
        self.timestamps
    }
}

/// One embedded-replica setting, for the option-list form of
/// [`Connector::embedded_replica`](crate::Connector::embedded_replica).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaOption {
    AuthToken(String),
    ReadYourWrites(bool),
    /// Validated and stored, but not yet passed to the engine.
    EncryptionKey(String),
    SyncInterval(Duration),
    UseWebpki(bool),
}

/// Builder for an embedded replica: a local file at `path` synchronized with `primary_url`.
///
/// Each setting may be given at most once. Setters never fail on their own; every violation is
/// recorded and [`build`](Self::build) reports all of them together.
#[derive(Debug, Clone)]
pub struct ReplicaBuilder {
    path: String,
    primary_url: String,
    auth_token: Option<String>,
    read_your_writes: Option<bool>,
    encryption_key: Option<String>,
    sync_interval: Option<Duration>,
    use_webpki: Option<bool>,
    errors: Vec<OptionError>,
}

impl ReplicaBuilder {
    pub fn new(path: impl Into<String>, primary_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            primary_url: primary_url.into(),
            auth_token: None,
            read_your_writes: None,
            encryption_key: None,
            sync_interval: None,
            use_webpki: None,
            errors: Vec::new(),
        }
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        if set_once(&mut self.errors, &self.auth_token, "authToken") {
            if token.is_empty() {
                self.errors.push(OptionError::Empty("authToken"));
            } else {
                self.auth_token = Some(token);
            }
        }
        self
    }

    pub fn read_your_writes(mut self, enabled: bool) -> Self {
        if set_once(&mut self.errors, &self.read_your_writes, "read your writes") {
            self.read_your_writes = Some(enabled);
        }
        self
    }

    pub fn encryption_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if set_once(&mut self.errors, &self.encryption_key, "encryption key") {
            if key.is_empty() {
                self.errors.push(OptionError::Empty("encryption key"));
            } else {
                self.encryption_key = Some(key);
            }
        }
        self
    }

    /// Period of background sync; zero disables it. Stored with millisecond precision.
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        if set_once(&mut self.errors, &self.sync_interval, "sync interval") {
            self.sync_interval = Some(interval);
        }
        self
    }

    pub fn use_webpki(mut self, enabled: bool) -> Self {
        if set_once(&mut self.errors, &self.use_webpki, "webpki") {
            self.use_webpki = Some(enabled);
        }
        self
    }

    pub fn apply(self, option: ReplicaOption) -> Self {
        match option {
            ReplicaOption::AuthToken(t) => self.auth_token(t),
            ReplicaOption::ReadYourWrites(b) => self.read_your_writes(b),
            ReplicaOption::EncryptionKey(k) => self.encryption_key(k),
            ReplicaOption::SyncInterval(d) => self.sync_interval(d),
            ReplicaOption::UseWebpki(b) => self.use_webpki(b),
        }
    }

    /// # Errors
    ///
    /// [`Error::Options`] with one entry per rejected setter call, in call order.
    pub fn build(self) -> Result<ConnectorOptions> {
        if !self.errors.is_empty() {
            return Err(Error::Options(OptionErrors(self.errors)));
        }

        let sync_interval_millis = self
            .sync_interval
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));

        Ok(ConnectorOptions {
            url: self.primary_url,
            path: self.path,
            auth_token: self.auth_token.unwrap_or_default(),
            encryption_key: self.encryption_key.unwrap_or_default(),
            sync_interval_millis,
            use_webpki: self.use_webpki.unwrap_or(false),
            not_read_your_writes: !self.read_your_writes.unwrap_or(true),
            timestamps: TimestampDecoding::default(),
        })
    }
}

/// Records `AlreadySet` and returns false when `slot` is occupied.
fn set_once<T>(errors: &mut Vec<OptionError>, slot: &Option<T>, name: &'static str) -> bool {
    if slot.is_some() {
        errors.push(OptionError::AlreadySet(name));
        false
    } else {
        true
    }
}

// ---------------------------- DSN parsing ----------------------------

/// Split `scheme:rest`. A string without a leading scheme yields an empty scheme.
fn split_scheme(s: &str) -> Result<(&str, &str)> {
    for (i, c) in s.char_indices() {
        match c {
            'a'..='z' | 'A'..='Z' => {}
            '0'..='9' | '+' | '-' | '.' if i > 0 => {}
            ':' if i == 0 => return Err(Error::InvalidUrl("missing protocol scheme".into())),
            ':' => return Ok((&s[..i], &s[i + 1..])),
            _ => break,
        }
    }
    Ok(("", s))
}

/// Drop `?query` and `#fragment`.
fn strip_suffixes(s: &str) -> &str {
    match s.find(['?', '#']) {
        Some(i) => &s[..i],
        None => s,
    }
}

fn file_path(rest: &str) -> Result<String> {
    let rest = strip_suffixes(rest);
    match rest.strip_prefix("//") {
        // file://authority/path: the authority (usually empty) is ignored.
        Some(hier) => {
            let path = hier.find('/').map_or("", |i| &hier[i..]);
            decode_component(path)
        }
        None => Ok(rest.to_string()),
    }
}

fn remote_options(rest: &str) -> Result<ConnectorOptions> {
    let without_fragment = rest.split('#').next().unwrap_or("");
    let (hier, query) = match without_fragment.split_once('?') {
        Some((h, q)) => (h, q),
        None => (without_fragment, ""),
    };

    let hier = hier.strip_prefix("//").unwrap_or(hier);
    let authority = hier.split('/').next().unwrap_or("");
    let host = match authority.rsplit_once('@') {
        Some((_userinfo, host)) => host,
        None => authority,
    };
    if host.is_empty() {
        return Err(Error::InvalidUrl(format!("missing host in '{rest}'")));
    }

    let auth_token = query_param(query, "authToken")?.unwrap_or_default();
    let path = query_param(query, "path")?.unwrap_or_default();

    Ok(ConnectorOptions {
        url: format!("libsql://{host}"),
        path,
        auth_token,
        ..ConnectorOptions::default()
    })
}

/// First value for `key` in an `a=1&b=2` query string.
fn query_param(query: &str, key: &str) -> Result<Option<String>> {
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        if decode_component(k)? == key {
            return decode_component(v).map(Some);
        }
    }
    Ok(None)
}

fn decode_component(s: &str) -> Result<String> {
    let s = s.replace('+', " ");
    urlencoding::decode(&s)
        .map(|c| c.into_owned())
        .map_err(|e| Error::InvalidUrl(e.to_string()))
}
