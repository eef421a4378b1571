//! Read-only `DuckDB` connection handling.

use std::path::Path;

use ::duckdb::{AccessMode as DuckAccessMode, Config, Connection};

/// Access mode for store connections.
///
/// The analytics pipeline never writes, so only read-only connections are
/// opened against the store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only access.
    ReadOnly,
}

/// Open a connection to the store file.
///
/// # Errors
/// Returns an error if the database file cannot be opened or configured.
pub(crate) fn open_connection(path: &Path, mode: AccessMode) -> Result<Connection, ::duckdb::Error> {
    let config = match mode {
        AccessMode::ReadOnly => Config::default().access_mode(DuckAccessMode::ReadOnly)?,
    };
    let connection = Connection::open_with_flags(path, config)?;
    configure_connection(&connection)?;
    Ok(connection)
}

/// Apply session settings and run a connectivity probe.
///
/// # Errors
/// Returns an error if configuration SQL or the probe query fails.
fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")?;
    let probe: i32 = connection.query_row("SELECT 1", [], |row| row.get(0))?;
    debug_assert_eq!(probe, 1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_only_connection_rejects_writes() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("store.duckdb");
        {
            let seed = Connection::open(&path).expect("seed connection");
            seed.execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);")
                .expect("seed");
        }

        let connection = open_connection(&path, AccessMode::ReadOnly).expect("open read-only");
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .expect("read");
        assert_eq!(count, 1);

        let write = connection.execute_batch("INSERT INTO t VALUES (2)");
        assert!(write.is_err(), "read-only connection must refuse writes");
    }
}
