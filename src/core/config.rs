//! Store configuration: input limits and short-id sizing.
//!
//! Loaded from an optional `agora.toml` at the store root; every field has the
//! stock default, so an absent or partial file is fine.

use crate::core::error::AgoraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "agora.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgoraConfig {
    pub short_id_len: usize,
    pub max_body_chars: usize,
    pub min_title_chars: usize,
    pub max_title_chars: usize,
    pub max_tags: usize,
    pub max_tag_chars: usize,
    pub max_page_size: u32,
    pub max_notification_batch: usize,
}

impl Default for AgoraConfig {
    fn default() -> Self {
        Self {
            short_id_len: 7,
            max_body_chars: 10_000,
            min_title_chars: 3,
            max_title_chars: 100,
            max_tags: 5,
            max_tag_chars: 32,
            max_page_size: 100,
            max_notification_batch: 1024,
        }
    }
}

pub fn load(root: &Path) -> Result<AgoraConfig, AgoraError> {
    let path = root.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok(AgoraConfig::default());
    }
    let content = fs::read_to_string(&path).map_err(AgoraError::Io)?;
    toml::from_str(&content).map_err(|e| AgoraError::Validation(e.to_string()))
}
