use duckdb::{AccessMode, Config, Connection};
use r2d2::ManageConnection;

pub const IN_MEMORY: &str = ":memory:";

/// Hands out DuckDB connections for the query path.
///
/// Connections are opened with external access disabled so generated SQL
/// cannot reach the filesystem through table functions such as `read_csv`.
pub struct DuckDBConnectionManager {
    connection_string: String,
    read_only: bool,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            read_only: false,
        }
    }

    /// Open file databases in read-only mode. Ignored for in-memory databases.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    fn flags(&self) -> Result<Config, duckdb::Error> {
        let config = Config::default().enable_external_access(false)?;
        if self.read_only && !self.is_in_memory() {
            config.access_mode(AccessMode::ReadOnly)
        } else {
            Ok(config)
        }
    }

    fn is_in_memory(&self) -> bool {
        self.connection_string.is_empty() || self.connection_string == IN_MEMORY
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let flags = self.flags()?;
        if self.is_in_memory() {
            Connection::open_in_memory_with_flags(flags)
        } else {
            Connection::open_with_flags(&self.connection_string, flags)
        }
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
