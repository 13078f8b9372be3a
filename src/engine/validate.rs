//! Input validation applied before drafts reach the engine.
//!
//! Mirrors the request-surface rules: body and title length bounds, tag shape,
//! link posts must carry an http(s) URL body, and page/batch sizing. Everything
//! here rejects with `AgoraError::Validation`; the engine itself assumes
//! already-validated input.

use crate::core::config::AgoraConfig;
use crate::core::error::AgoraError;
use crate::engine::content::{CommentDraft, ItemKind, PostDraft};
use regex::Regex;
use std::sync::LazyLock;

static LINK_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#]+\.[^\s]+$").unwrap());

pub fn validate_post(draft: &PostDraft, cfg: &AgoraConfig) -> Result<(), AgoraError> {
    if draft.kind.is_comment() {
        return Err(AgoraError::Validation(
            "post kind must be TEXT, LINK, or QUESTION".to_string(),
        ));
    }

    let title_len = draft.title.chars().count();
    if title_len < cfg.min_title_chars || title_len > cfg.max_title_chars {
        return Err(AgoraError::Validation(format!(
            "title must be {}-{} characters",
            cfg.min_title_chars, cfg.max_title_chars
        )));
    }

    validate_body(&draft.body, cfg)?;

    if draft.kind == ItemKind::Link && !LINK_URL_RE.is_match(draft.body.trim()) {
        return Err(AgoraError::Validation(
            "link posts require an http(s) URL body".to_string(),
        ));
    }

    if draft.tags.len() > cfg.max_tags {
        return Err(AgoraError::Validation(format!(
            "at most {} tags allowed",
            cfg.max_tags
        )));
    }
    for tag in &draft.tags {
        let len = tag.chars().count();
        if len == 0 || len > cfg.max_tag_chars {
            return Err(AgoraError::Validation(format!(
                "tags must be 1-{} characters",
                cfg.max_tag_chars
            )));
        }
    }

    Ok(())
}

pub fn validate_comment(draft: &CommentDraft, cfg: &AgoraConfig) -> Result<(), AgoraError> {
    if draft.body.is_empty() {
        return Err(AgoraError::Validation("comment body is empty".to_string()));
    }
    validate_body(&draft.body, cfg)?;
    if draft.reply_to.is_empty() {
        return Err(AgoraError::Validation("reply target is required".to_string()));
    }
    Ok(())
}

fn validate_body(body: &str, cfg: &AgoraConfig) -> Result<(), AgoraError> {
    if body.chars().count() > cfg.max_body_chars {
        return Err(AgoraError::Validation(format!(
            "body exceeds {} characters",
            cfg.max_body_chars
        )));
    }
    Ok(())
}

pub fn validate_page(limit: u32, cfg: &AgoraConfig) -> Result<(), AgoraError> {
    if limit == 0 || limit > cfg.max_page_size {
        return Err(AgoraError::Validation(format!(
            "limit must be 1-{}",
            cfg.max_page_size
        )));
    }
    Ok(())
}

pub fn validate_id_batch(ids: &[String], cfg: &AgoraConfig) -> Result<(), AgoraError> {
    if ids.len() > cfg.max_notification_batch {
        return Err(AgoraError::Validation(format!(
            "at most {} ids per batch",
            cfg.max_notification_batch
        )));
    }
    Ok(())
}
