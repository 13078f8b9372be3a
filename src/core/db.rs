use crate::core::error::AgoraError;
use rusqlite::Connection;

/// Open a connection with the settings every Agora database uses: WAL for
/// concurrent readers, a busy timeout instead of in-process locking, and
/// foreign keys on. Per-statement atomicity is the only write-safety mechanism
/// the engine relies on; no caller ever wraps multiple documents in one
/// transaction.
pub fn db_connect(db_path: &str) -> Result<Connection, AgoraError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(AgoraError::Rusqlite)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(AgoraError::Rusqlite)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(AgoraError::Rusqlite)?;
    Ok(conn)
}
