//! Mutation audit log around database access.
//!
//! Every engine operation runs under [`AuditLog::with_conn`], which appends one
//! JSONL event per operation to `agora.events.jsonl`. There is deliberately no
//! in-process serialization here: concurrent requests interleave freely and the
//! only write-safety mechanism is the per-statement atomicity of the store
//! itself. WAL mode plus the connection busy timeout handle contention.

use crate::core::db;
use crate::core::error::AgoraError;
use crate::core::store;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub struct AuditLog {
    events_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuditEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl AuditLog {
    pub fn new(root: &Path) -> Self {
        Self {
            events_path: store::events_path(root),
        }
    }

    /// Execute a closure against the given database and record the outcome.
    pub fn with_conn<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        f: F,
    ) -> Result<R, AgoraError>
    where
        F: FnOnce(&Connection) -> Result<R, AgoraError>,
    {
        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let conn = db::db_connect(&db_path.to_string_lossy())?;

        let result = f(&conn);

        let status = if result.is_ok() { "success" } else { "error" };
        self.log_event(actor, op_name, &db_id, status)?;

        result
    }

    fn log_event(&self, actor: &str, op: &str, db_id: &str, status: &str) -> Result<(), AgoraError> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let ev = AuditEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_object_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)
            .map_err(AgoraError::Io)?;

        writeln!(f, "{}", serde_json::to_string(&ev)?).map_err(AgoraError::Io)?;
        Ok(())
    }
}
