//! The star ledger: idempotent per-user toggles and the accounting they drive.
//!
//! Step 1 (the set flip on the user document) is the source of truth and the
//! only atomicity boundary. Steps 2-4 (item counter, author score, parent
//! ranking rewrite) are independently committed follow-ups: two concurrent
//! toggles on siblings can interleave so the ranking rewrite overwrites a
//! concurrent delta. That lost-update window is a documented property of the
//! design, acceptable at one star click per end user, and is not "fixed" here.

use crate::core::audit::AuditLog;
use crate::core::error::AgoraError;
use crate::core::store;
use crate::engine::content::{self, ChildRef};
use crate::engine::users::{self, ScoreKind};
use rusqlite::{Connection, OptionalExtension, types::ToSql};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StarAction {
    Starred,
    Unstarred,
}

impl StarAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StarAction::Starred => "STARRED",
            StarAction::Unstarred => "UNSTARRED",
        }
    }
}

pub fn toggle_star(root: &Path, user_id: &str, item_id: &str) -> Result<StarAction, AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, user_id, "agora.star", |conn| {
        content::ensure_schema(conn)?;

        let (item_author, item_reply_to) = conn
            .query_row(
                "SELECT author, reply_to FROM agoragrams WHERE id = ?1",
                [item_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| AgoraError::NotFound(format!("agoragram {}", item_id)))?;

        let user_exists: Option<i64> = conn
            .query_row("SELECT 1 FROM users WHERE id = ?1", [user_id], |row| {
                row.get(0)
            })
            .optional()?;
        if user_exists.is_none() {
            return Err(AgoraError::NotFound(format!("user {}", user_id)));
        }

        // Step 1: set-add guarded by a membership probe, one atomic statement.
        // Zero changed rows means the item was already in the set; pull it
        // instead. Idempotent per logical click either way.
        let added = conn.execute(
            "UPDATE users SET starred = json_insert(starred, '$[#]', ?2)
             WHERE id = ?1
               AND NOT EXISTS (SELECT 1 FROM json_each(users.starred) WHERE value = ?2)",
            rusqlite::params![user_id, item_id],
        )?;
        let (action, delta) = if added == 1 {
            (StarAction::Starred, 1i64)
        } else {
            conn.execute(
                "UPDATE users SET starred = (
                     SELECT COALESCE(json_group_array(value), '[]')
                     FROM json_each(users.starred) WHERE value <> ?2
                 ) WHERE id = ?1",
                rusqlite::params![user_id, item_id],
            )?;
            (StarAction::Unstarred, -1i64)
        };

        // Steps 2-4: uncompensated follow-ups; the ledger flip stands even
        // when one of them fails.
        if let Err(err) = conn.execute(
            "UPDATE agoragrams SET stars = stars + ?2 WHERE id = ?1",
            rusqlite::params![item_id, delta],
        ) {
            eprintln!("agora: star count update failed for {}: {}", item_id, err);
        }
        if let Some(author) = item_author {
            if let Err(err) = users::bump_score(conn, &author, ScoreKind::Stars, delta) {
                eprintln!("agora: star score update failed for {}: {}", author, err);
            }
        }
        if let Some(parent_id) = item_reply_to {
            if let Err(err) = resort_children(conn, &parent_id, item_id, delta) {
                eprintln!(
                    "agora: children index rewrite failed for {}: {}",
                    parent_id, err
                );
            }
        }

        Ok(action)
    })
}

/// Rewrite the parent's ranking cache: apply the delta to the matching entry,
/// re-sort the whole array descending by stars, write it back in full. The
/// read and the overwrite are two separate statements; this is the documented
/// lost-update window.
fn resort_children(
    conn: &Connection,
    parent_id: &str,
    child_id: &str,
    delta: i64,
) -> Result<(), AgoraError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT children FROM agoragrams WHERE id = ?1",
            [parent_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(raw) = raw else {
        // Parent hard-deleted between statements; nothing to rank.
        return Ok(());
    };

    let mut children: Vec<ChildRef> = serde_json::from_str(&raw)?;
    for child in &mut children {
        if child.id == child_id {
            child.stars += delta;
        }
    }
    // Stable sort: equal star counts keep their existing relative order.
    children.sort_by(|a, b| b.stars.cmp(&a.stars));

    conn.execute(
        "UPDATE agoragrams SET children = ?2 WHERE id = ?1",
        rusqlite::params![parent_id, serde_json::to_string(&children)?],
    )?;
    Ok(())
}

/// Which of the given items the user has starred: the intersection of the
/// user's starred set with the batch.
pub fn check_starred(
    root: &Path,
    user_id: &str,
    item_ids: &[String],
) -> Result<FxHashSet<String>, AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);
    let user_key = user_id.to_string();

    audit.with_conn(&db_path, user_id, "agora.starred", |conn| {
        content::ensure_schema(conn)?;
        if item_ids.is_empty() {
            return Ok(FxHashSet::default());
        }

        let placeholders = (0..item_ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT je.value FROM users, json_each(users.starred) AS je
             WHERE users.id = ?1 AND je.value IN ({})",
            placeholders
        );

        let mut params: Vec<&dyn ToSql> = vec![&user_key];
        for id in item_ids {
            params.push(id);
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            row.get::<_, String>(0)
        })?;

        let mut starred = FxHashSet::default();
        for row in rows {
            starred.insert(row?);
        }
        Ok(starred)
    })
}
