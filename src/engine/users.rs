//! User aggregate rows: score counters, the starred-item set, and the embedded
//! notification list. Only the slice the engine needs; credentials, profiles,
//! and mail are upstream concerns.

use crate::core::audit::AuditLog;
use crate::core::error::AgoraError;
use crate::core::store;
use crate::core::time;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub score_posts: i64,
    pub score_comments: i64,
    pub score_stars: i64,
    pub starred: Vec<String>,
    pub created_at: String,
}

/// Read-only author projection attached to feed and subtree rows.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthorInfo {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ScoreKind {
    Posts,
    Comments,
    Stars,
}

impl ScoreKind {
    fn column(self) -> &'static str {
        match self {
            ScoreKind::Posts => "score_posts",
            ScoreKind::Comments => "score_comments",
            ScoreKind::Stars => "score_stars",
        }
    }
}

/// Single-row counter increment. A missing user is a no-op, matching the
/// fire-and-forget score writes of the content and star paths.
pub(crate) fn bump_score(
    conn: &Connection,
    user_id: &str,
    kind: ScoreKind,
    delta: i64,
) -> Result<(), AgoraError> {
    let sql = format!(
        "UPDATE users SET {col} = {col} + ?2 WHERE id = ?1",
        col = kind.column()
    );
    conn.execute(&sql, rusqlite::params![user_id, delta])?;
    Ok(())
}

pub fn create_user(
    root: &Path,
    username: &str,
    first_name: &str,
    last_name: &str,
) -> Result<User, AgoraError> {
    let id = time::new_object_id();
    let ts = time::now_epoch_z();
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, &id, "user.add", |conn| {
        crate::engine::content::ensure_schema(conn)?;
        conn.execute(
            "INSERT INTO users(id, username, first_name, last_name, created_at)
             VALUES(?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, username, first_name, last_name, ts],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(code, Some(ref msg))
                if code.code == rusqlite::ErrorCode::ConstraintViolation
                    && msg.contains("users.username") =>
            {
                AgoraError::Validation(format!("username '{}' is taken", username))
            }
            other => AgoraError::Rusqlite(other),
        })?;
        fetch_user(conn, &id)?.ok_or_else(|| AgoraError::NotFound(format!("user {}", id)))
    })
}

pub fn get_user(root: &Path, id: &str) -> Result<Option<User>, AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, id, "user.get", |conn| {
        crate::engine::content::ensure_schema(conn)?;
        fetch_user(conn, id)
    })
}

pub(crate) fn fetch_user(conn: &Connection, id: &str) -> Result<Option<User>, AgoraError> {
    let row = conn
        .query_row(
            "SELECT id, username, first_name, last_name, score_posts, score_comments,
                    score_stars, starred, created_at
             FROM users WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            },
        )
        .optional()?;

    let Some((id, username, first_name, last_name, posts, comments, stars, starred, created_at)) =
        row
    else {
        return Ok(None);
    };

    Ok(Some(User {
        id,
        username,
        first_name,
        last_name,
        score_posts: posts,
        score_comments: comments,
        score_stars: stars,
        starred: serde_json::from_str(&starred)?,
        created_at,
    }))
}
