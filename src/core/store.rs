//! Store-root resolution and database path helpers.
//!
//! An Agora store is a directory holding `agora.db`, the mutation audit log,
//! and an optional `agora.toml`. All engine functions take the store root and
//! derive paths from it.

use crate::core::schemas;
use std::env;
use std::path::{Path, PathBuf};

pub fn agora_db_path(root: &Path) -> PathBuf {
    root.join(schemas::AGORA_DB_NAME)
}

pub fn events_path(root: &Path) -> PathBuf {
    root.join(schemas::AGORA_EVENTS_NAME)
}

/// CLI store-root resolution: explicit `--dir`, then `$AGORA_HOME`, then a
/// project-local `./.agora/data`.
pub fn resolve_root(dir: Option<PathBuf>) -> PathBuf {
    if let Some(d) = dir {
        return d;
    }
    if let Ok(home) = env::var("AGORA_HOME") {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }
    PathBuf::from(".agora").join("data")
}
