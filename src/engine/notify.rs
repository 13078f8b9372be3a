//! Notification fan-out and the per-user notification list.
//!
//! Records live embedded in the recipient's `notifications` JSON column,
//! append-only until the user prunes them. Every list operation is one atomic
//! rewrite of that single document; reads materialize the whole list, reverse
//! it newest-first, then page. Acceptable only while lists stay small.

use crate::core::audit::AuditLog;
use crate::core::error::AgoraError;
use crate::core::store;
use crate::core::time;
use crate::engine::content::{self, ItemKind, PostRef};
use rusqlite::{Connection, OptionalExtension, types::ToSql};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    CommentOnPost,
    CommentOnComment,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NotificationData {
    pub post: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Notification {
    pub id: String,
    pub ts: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub data: NotificationData,
    #[serde(default)]
    pub read: bool,
}

/// Append one record to the recipient's list. A missing recipient is a no-op;
/// the append is never compensated against the comment that triggered it.
pub(crate) fn push_notification(
    conn: &Connection,
    user_id: &str,
    kind: NotificationKind,
    data: NotificationData,
) -> Result<Notification, AgoraError> {
    let record = Notification {
        id: time::new_object_id(),
        ts: time::now_epoch_z(),
        kind,
        data,
        read: false,
    };
    conn.execute(
        "UPDATE users SET notifications = json_insert(notifications, '$[#]', json(?2))
         WHERE id = ?1",
        rusqlite::params![user_id, serde_json::to_string(&record)?],
    )?;
    Ok(record)
}

/// Fan-out rules for a freshly created comment. Each append is independent and
/// none blocks the others:
/// - parent is a comment: its author gets CommentOnComment, unless the actor
///   is that author;
/// - the root post's author gets CommentOnPost, unless the actor is that
///   author, and unless the same user was already notified above. Replying
///   directly to the root yields exactly one notification.
pub(crate) fn fan_out_comment(
    conn: &Connection,
    actor: &str,
    parent_id: &str,
    parent_kind: ItemKind,
    parent_author: Option<&str>,
    post: &PostRef,
) -> Result<(), AgoraError> {
    if parent_kind.is_comment() {
        let mut already_notified: Option<&str> = None;
        if let Some(author) = parent_author {
            if author != actor {
                push_notification(
                    conn,
                    author,
                    NotificationKind::CommentOnComment,
                    NotificationData {
                        post: post.id.clone(),
                        comment: Some(parent_id.to_string()),
                    },
                )?;
                already_notified = Some(author);
            }
        }

        let root_author: Option<String> = conn
            .query_row(
                "SELECT author FROM agoragrams WHERE id = ?1",
                [&post.id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        if let Some(author) = root_author {
            if author != actor && Some(author.as_str()) != already_notified {
                push_notification(
                    conn,
                    &author,
                    NotificationKind::CommentOnPost,
                    NotificationData {
                        post: post.id.clone(),
                        comment: None,
                    },
                )?;
            }
        }
    } else if let Some(author) = parent_author {
        if author != actor {
            push_notification(
                conn,
                author,
                NotificationKind::CommentOnPost,
                NotificationData {
                    post: parent_id.to_string(),
                    comment: None,
                },
            )?;
        }
    }
    Ok(())
}

/// Newest-first page over the fully materialized list.
pub fn list_notifications(
    root: &Path,
    user_id: &str,
    skip: usize,
    limit: usize,
) -> Result<Vec<Notification>, AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, user_id, "notification.list", |conn| {
        content::ensure_schema(conn)?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT notifications FROM users WHERE id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;
        let raw = raw.ok_or_else(|| AgoraError::NotFound(format!("user {}", user_id)))?;
        let mut all: Vec<Notification> = serde_json::from_str(&raw)?;
        all.reverse();
        Ok(all.into_iter().skip(skip).take(limit).collect())
    })
}

fn require_user_row(changes: usize, user_id: &str) -> Result<(), AgoraError> {
    if changes == 0 {
        return Err(AgoraError::NotFound(format!("user {}", user_id)));
    }
    Ok(())
}

fn id_placeholders(first_index: usize, count: usize) -> String {
    (0..count)
        .map(|i| format!("?{}", first_index + i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn id_params<'a>(user_id: &'a String, ids: &'a [String]) -> Vec<&'a dyn ToSql> {
    let mut params: Vec<&dyn ToSql> = vec![user_id];
    for id in ids {
        params.push(id);
    }
    params
}

pub fn mark_read(root: &Path, user_id: &str, ids: &[String]) -> Result<(), AgoraError> {
    if ids.is_empty() {
        return Ok(());
    }
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);
    let user_key = user_id.to_string();

    audit.with_conn(&db_path, user_id, "notification.read", |conn| {
        content::ensure_schema(conn)?;
        let sql = format!(
            "UPDATE users SET notifications = (
                 SELECT COALESCE(json_group_array(json(
                     CASE WHEN json_extract(value, '$.id') IN ({ids})
                          THEN json_set(value, '$.read', json('true'))
                          ELSE value END
                 )), '[]')
                 FROM json_each(users.notifications)
             ) WHERE id = ?1",
            ids = id_placeholders(2, ids.len())
        );
        let changes = conn.execute(
            &sql,
            rusqlite::params_from_iter(id_params(&user_key, ids)),
        )?;
        require_user_row(changes, user_id)
    })
}

pub fn mark_all_read(root: &Path, user_id: &str) -> Result<(), AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, user_id, "notification.read_all", |conn| {
        content::ensure_schema(conn)?;
        let changes = conn.execute(
            "UPDATE users SET notifications = (
                 SELECT COALESCE(json_group_array(json(
                     json_set(value, '$.read', json('true'))
                 )), '[]')
                 FROM json_each(users.notifications)
             ) WHERE id = ?1",
            [user_id],
        )?;
        require_user_row(changes, user_id)
    })
}

pub fn delete_notifications(root: &Path, user_id: &str, ids: &[String]) -> Result<(), AgoraError> {
    if ids.is_empty() {
        return Ok(());
    }
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);
    let user_key = user_id.to_string();

    audit.with_conn(&db_path, user_id, "notification.delete", |conn| {
        content::ensure_schema(conn)?;
        let sql = format!(
            "UPDATE users SET notifications = (
                 SELECT COALESCE(json_group_array(json(value)), '[]')
                 FROM json_each(users.notifications)
                 WHERE json_extract(value, '$.id') NOT IN ({ids})
             ) WHERE id = ?1",
            ids = id_placeholders(2, ids.len())
        );
        let changes = conn.execute(
            &sql,
            rusqlite::params_from_iter(id_params(&user_key, ids)),
        )?;
        require_user_row(changes, user_id)
    })
}

pub fn delete_all_notifications(root: &Path, user_id: &str) -> Result<(), AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, user_id, "notification.delete_all", |conn| {
        content::ensure_schema(conn)?;
        let changes = conn.execute(
            "UPDATE users SET notifications = '[]' WHERE id = ?1",
            [user_id],
        )?;
        require_user_row(changes, user_id)
    })
}

/// Prune every record already marked read, keep the rest.
pub fn delete_read_notifications(root: &Path, user_id: &str) -> Result<(), AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, user_id, "notification.delete_read", |conn| {
        content::ensure_schema(conn)?;
        let changes = conn.execute(
            "UPDATE users SET notifications = (
                 SELECT COALESCE(json_group_array(json(value)), '[]')
                 FROM json_each(users.notifications)
                 WHERE COALESCE(json_extract(value, '$.read'), 0) = 0
             ) WHERE id = ?1",
            [user_id],
        )?;
        require_user_row(changes, user_id)
    })
}
