//! The read side: paginated feeds, subtree retrieval, author projection.

use crate::core::audit::AuditLog;
use crate::core::error::AgoraError;
use crate::core::store;
use crate::engine::content::{self, Agoragram};
use crate::engine::users::AuthorInfo;
use clap::ValueEnum;
use rusqlite::{OptionalExtension, types::ToSql};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedSort {
    /// Primary-id descending; ids are monotone with creation time.
    New,
    /// Star count descending. The source order left ties undefined; id
    /// descending is the deterministic tie-break used here.
    Top,
}

#[derive(Debug, Clone, Default)]
pub struct FeedFilters {
    /// Cursor primitive: restrict to id >= from_id.
    pub from_id: Option<String>,
    pub hypagora: Option<String>,
    pub author_id: Option<String>,
}

fn feed_select() -> String {
    format!(
        "SELECT {}, u.username, u.first_name, u.last_name
         FROM agoragrams a LEFT JOIN users u ON u.id = a.author",
        content::agoragram_select("a.")
    )
}

fn feed_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Agoragram> {
    let mut item = content::agoragram_from_row(row)?;
    let username: Option<String> = row.get(18)?;
    if let (Some(author_id), Some(username)) = (item.author.clone(), username) {
        item.author_details = Some(AuthorInfo {
            id: author_id,
            username,
            first_name: row.get(19)?,
            last_name: row.get(20)?,
        });
    }
    Ok(item)
}

pub fn list_posts(
    root: &Path,
    sort: FeedSort,
    skip: u32,
    limit: u32,
    filters: &FeedFilters,
) -> Result<Vec<Agoragram>, AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, "agora", "agora.feed", |conn| {
        content::ensure_schema(conn)?;

        let mut sql = format!("{} WHERE a.kind <> 'COMMENT'", feed_select());
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(from_id) = &filters.from_id {
            sql.push_str(" AND a.id >= ?");
            params.push(Box::new(from_id.clone()));
        }
        if let Some(hypagora) = &filters.hypagora {
            sql.push_str(" AND a.hypagora = ?");
            params.push(Box::new(hypagora.clone()));
        }
        if let Some(author_id) = &filters.author_id {
            sql.push_str(" AND a.author = ?");
            params.push(Box::new(author_id.clone()));
        }

        match sort {
            FeedSort::New => sql.push_str(" ORDER BY a.id DESC"),
            FeedSort::Top => sql.push_str(" ORDER BY a.stars DESC, a.id DESC"),
        }
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(Box::new(limit as i64));
        params.push(Box::new(skip as i64));

        let mut stmt = conn.prepare(&sql)?;
        let params_as_dyn: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(
            rusqlite::params_from_iter(params_as_dyn.iter().copied()),
            feed_row,
        )?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
}

/// The root item plus every descendant sharing its root pointer, as a flat
/// list ordered by id ascending. Accepts a primary id or a short id. The
/// consumer rebuilds the tree from `reply_to` and the children indexes.
pub fn get_subtree(root: &Path, id_or_short_id: &str) -> Result<Vec<Agoragram>, AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, id_or_short_id, "agora.thread", |conn| {
        content::ensure_schema(conn)?;

        let sql = format!(
            "{} WHERE a.id = ?1 OR a.short_id = ?1 OR a.post_id = ?1 OR a.post_short_id = ?1
             ORDER BY a.id ASC",
            feed_select()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([id_or_short_id], feed_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        if out.is_empty() {
            return Err(AgoraError::NotFound(format!(
                "agoragram {}",
                id_or_short_id
            )));
        }
        Ok(out)
    })
}

/// Read-only dereference of an author id; tombstoned or unknown yields None.
pub fn resolve_author(root: &Path, author_id: &str) -> Result<Option<AuthorInfo>, AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, author_id, "agora.author", |conn| {
        content::ensure_schema(conn)?;
        conn.query_row(
            "SELECT id, username, first_name, last_name FROM users WHERE id = ?1",
            [author_id],
            |row| {
                Ok(AuthorInfo {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(AgoraError::Rusqlite)
    })
}
