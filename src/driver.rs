use crate::{config::ConnectorOptions, connection::Connection, database::Connector, Result};

/// Name under which this driver registers with connection-string based tooling.
pub const DRIVER_NAME: &str = "libsql";

/// Opens databases from connection strings.
///
/// See [`ConnectorOptions::from_dsn`] for the accepted forms.
#[derive(Debug, Default, Clone, Copy)]
pub struct Driver;

impl Driver {
    pub fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    /// Parse `dsn` and open the database it names. The connection string is validated before
    /// the native runtime is loaded.
    pub fn open_connector(&self, dsn: &str) -> Result<Connector> {
        let options = ConnectorOptions::from_dsn(dsn)?;
        Connector::new(options)
    }

    /// Open the database and one connection to it.
    ///
    /// The returned connection does not keep the database handle; it is released here and the
    /// connection stays usable on its own.
    pub fn open(&self, dsn: &str) -> Result<Connection> {
        self.open_connector(dsn)?.connect()
    }
}
