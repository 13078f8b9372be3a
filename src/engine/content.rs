//! The content store: the post/comment tree and its denormalized accounting.
//!
//! Writes here are sequences of independently committed single-document
//! statements. There is no cross-document transaction and no rollback: a
//! failure partway through comment creation leaves a dangling stub in the
//! parent's children index, and a failed downstream counter bump leaves an
//! undercount. Both are documented behavior, traded for availability.

use crate::core::audit::AuditLog;
use crate::core::config::{self, AgoraConfig};
use crate::core::error::AgoraError;
use crate::core::schemas;
use crate::core::shortid;
use crate::core::store;
use crate::core::time;
use crate::engine::notify;
use crate::engine::users::{self, AuthorInfo, ScoreKind};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "LINK")]
    Link,
    #[serde(rename = "QUESTION")]
    Question,
    #[serde(rename = "COMMENT")]
    Comment,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Text => "TEXT",
            ItemKind::Link => "LINK",
            ItemKind::Question => "QUESTION",
            ItemKind::Comment => "COMMENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TEXT" => Some(ItemKind::Text),
            "LINK" => Some(ItemKind::Link),
            "QUESTION" => Some(ItemKind::Question),
            "COMMENT" => Some(ItemKind::Comment),
            _ => None,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, ItemKind::Comment)
    }
}

/// One entry of the materialized ranking cache on a parent node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    pub id: String,
    pub stars: i64,
}

/// Root-post pointer carried by every comment, inherited transitively.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    pub id: String,
    pub short_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Agoragram {
    pub id: String,
    pub short_id: String,
    pub kind: ItemKind,
    pub author: Option<String>,
    pub title: Option<String>,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub hypagora: Option<String>,
    pub stars: i64,
    pub comment_amount: Option<i64>,
    #[serde(default)]
    pub children: Vec<ChildRef>,
    pub post: Option<PostRef>,
    pub reply_to: Option<String>,
    pub created_at: String,
    pub modified: Option<String>,
    pub pinned: Option<String>,
    pub deleted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_details: Option<AuthorInfo>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PostDraft {
    pub kind: ItemKind,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub hypagora: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CommentDraft {
    pub body: String,
    pub reply_to: String,
}

pub(crate) const AGORAGRAM_COLUMNS: &[&str] = &[
    "id",
    "short_id",
    "kind",
    "author",
    "title",
    "body",
    "tags",
    "hypagora",
    "stars",
    "comment_amount",
    "children",
    "post_id",
    "post_short_id",
    "reply_to",
    "created_at",
    "modified",
    "pinned",
    "deleted",
];

pub(crate) fn agoragram_select(prefix: &str) -> String {
    AGORAGRAM_COLUMNS
        .iter()
        .map(|c| format!("{}{}", prefix, c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn json_column_err(idx: usize, err: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

/// Map a row selected with [`agoragram_select`] column order. Usable directly
/// inside rusqlite query closures.
pub(crate) fn agoragram_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Agoragram> {
    let kind_raw: String = row.get(2)?;
    let kind = ItemKind::parse(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown agoragram kind '{}'", kind_raw).into(),
        )
    })?;

    let tags: Vec<String> = match row.get::<_, Option<String>>(6)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| json_column_err(6, e))?,
        None => Vec::new(),
    };
    let children_raw: String = row.get(10)?;
    let children: Vec<ChildRef> =
        serde_json::from_str(&children_raw).map_err(|e| json_column_err(10, e))?;

    let post = match (
        row.get::<_, Option<String>>(11)?,
        row.get::<_, Option<String>>(12)?,
    ) {
        (Some(id), Some(short_id)) => Some(PostRef { id, short_id }),
        _ => None,
    };

    Ok(Agoragram {
        id: row.get(0)?,
        short_id: row.get(1)?,
        kind,
        author: row.get(3)?,
        title: row.get(4)?,
        body: row.get(5)?,
        tags,
        hypagora: row.get(7)?,
        stars: row.get(8)?,
        comment_amount: row.get(9)?,
        children,
        post,
        reply_to: row.get(13)?,
        created_at: row.get(14)?,
        modified: row.get(15)?,
        pinned: row.get(16)?,
        deleted: row.get(17)?,
        author_details: None,
    })
}

pub(crate) fn ensure_schema(conn: &Connection) -> Result<(), AgoraError> {
    conn.execute(schemas::AGORA_DB_SCHEMA_META, [])?;

    let current: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(AgoraError::Rusqlite)?;

    let current_version: u32 = current
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    if current_version >= schemas::AGORA_SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute(schemas::AGORA_DB_SCHEMA_AGORAGRAMS, [])?;
    conn.execute(schemas::AGORA_DB_SCHEMA_USERS, [])?;
    conn.execute(schemas::AGORA_DB_SCHEMA_INDEX_STARS, [])?;
    conn.execute(schemas::AGORA_DB_SCHEMA_INDEX_POST, [])?;
    conn.execute(schemas::AGORA_DB_SCHEMA_INDEX_AUTHOR, [])?;

    conn.execute(
        "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [schemas::AGORA_SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn initialize_agora_db(root: &Path) -> Result<(), AgoraError> {
    fs::create_dir_all(root).map_err(AgoraError::Io)?;
    let db_path = store::agora_db_path(root);

    let audit = AuditLog::new(root);
    audit.with_conn(&db_path, "agora", "store.init", |conn| ensure_schema(conn))
}

/// Generate-insert-retry loop against the short-id UNIQUE constraint.
fn insert_with_fresh_short_id<F>(cfg: &AgoraConfig, mut attempt: F) -> Result<String, AgoraError>
where
    F: FnMut(&str) -> Result<usize, rusqlite::Error>,
{
    for _ in 0..shortid::MAX_GENERATE_ATTEMPTS {
        let candidate = shortid::random_short_id(cfg.short_id_len);
        match attempt(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(ref e) if shortid::is_short_id_collision(e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(AgoraError::Validation(
        "short-id generation exhausted its retry budget".to_string(),
    ))
}

pub fn create_post(root: &Path, author_id: &str, draft: &PostDraft) -> Result<Agoragram, AgoraError> {
    if draft.kind.is_comment() {
        return Err(AgoraError::Validation(
            "comments are created through create_comment".to_string(),
        ));
    }
    let cfg = config::load(root)?;
    let id = time::new_object_id();
    let ts = time::now_epoch_z();
    let tags_json = serde_json::to_string(&draft.tags)?;

    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, author_id, "agora.post", |conn| {
        ensure_schema(conn)?;

        insert_with_fresh_short_id(&cfg, |short_id| {
            conn.execute(
                "INSERT INTO agoragrams(id, short_id, kind, author, title, body, tags, hypagora,
                                        stars, comment_amount, children, created_at)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, '[]', ?9)",
                rusqlite::params![
                    id,
                    short_id,
                    draft.kind.as_str(),
                    author_id,
                    draft.title,
                    draft.body,
                    tags_json,
                    draft.hypagora,
                    ts
                ],
            )
        })?;

        // Independent write; a failure here undercounts the author's post score.
        if let Err(err) = users::bump_score(conn, author_id, ScoreKind::Posts, 1) {
            eprintln!("agora: post score increment failed for {}: {}", author_id, err);
        }

        fetch_agoragram(conn, &id)?.ok_or_else(|| AgoraError::NotFound(format!("agoragram {}", id)))
    })
}

struct ParentProjection {
    kind: ItemKind,
    author: Option<String>,
    short_id: String,
    post_id: Option<String>,
    post_short_id: Option<String>,
}

pub fn create_comment(
    root: &Path,
    author_id: &str,
    draft: &CommentDraft,
) -> Result<Agoragram, AgoraError> {
    let cfg = config::load(root)?;
    let comment_id = time::new_object_id();
    let ts = time::now_epoch_z();

    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, author_id, "agora.comment", |conn| {
        ensure_schema(conn)?;

        // Step 1: append the stub and read the parent projection in one atomic
        // statement. From here on the stub exists whether or not the comment
        // document materializes.
        let stub = serde_json::json!({ "id": comment_id, "stars": 0 }).to_string();
        let parent = conn
            .query_row(
                "UPDATE agoragrams SET children = json_insert(children, '$[#]', json(?2))
                 WHERE id = ?1
                 RETURNING kind, author, short_id, post_id, post_short_id",
                rusqlite::params![draft.reply_to, stub],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| AgoraError::NotFound(format!("agoragram {}", draft.reply_to)))?;

        let parent = ParentProjection {
            kind: ItemKind::parse(&parent.0).ok_or_else(|| {
                AgoraError::Validation(format!("unknown agoragram kind '{}'", parent.0))
            })?,
            author: parent.1,
            short_id: parent.2,
            post_id: parent.3,
            post_short_id: parent.4,
        };

        // Step 2: resolve the root pointer from the parent just read.
        let post = if parent.kind.is_comment() {
            match (parent.post_id.clone(), parent.post_short_id.clone()) {
                (Some(id), Some(short_id)) => PostRef { id, short_id },
                _ => {
                    return Err(AgoraError::Validation(format!(
                        "comment {} has no root pointer",
                        draft.reply_to
                    )));
                }
            }
        } else {
            PostRef {
                id: draft.reply_to.clone(),
                short_id: parent.short_id.clone(),
            }
        };

        // Step 3: create the comment document itself.
        insert_with_fresh_short_id(&cfg, |short_id| {
            conn.execute(
                "INSERT INTO agoragrams(id, short_id, kind, author, body, stars, children,
                                        post_id, post_short_id, reply_to, created_at)
                 VALUES(?1, ?2, 'COMMENT', ?3, ?4, 0, '[]', ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    comment_id,
                    short_id,
                    author_id,
                    draft.body,
                    post.id,
                    post.short_id,
                    draft.reply_to,
                    ts
                ],
            )
        })?;

        // Steps 4-6 are independent, uncompensated side effects: the comment
        // stands even when one of them fails.
        if let Err(err) = conn.execute(
            "UPDATE agoragrams SET comment_amount = comment_amount + 1 WHERE id = ?1",
            [&post.id],
        ) {
            eprintln!("agora: comment_amount increment failed for {}: {}", post.id, err);
        }
        if let Err(err) = users::bump_score(conn, author_id, ScoreKind::Comments, 1) {
            eprintln!("agora: comment score increment failed for {}: {}", author_id, err);
        }
        if let Err(err) = notify::fan_out_comment(
            conn,
            author_id,
            &draft.reply_to,
            parent.kind,
            parent.author.as_deref(),
            &post,
        ) {
            eprintln!("agora: notification fan-out failed for {}: {}", comment_id, err);
        }

        fetch_agoragram(conn, &comment_id)?
            .ok_or_else(|| AgoraError::NotFound(format!("agoragram {}", comment_id)))
    })
}

pub fn update_body(root: &Path, id: &str, body: &str) -> Result<Agoragram, AgoraError> {
    let ts = time::now_epoch_z();
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, id, "agora.edit", |conn| {
        ensure_schema(conn)?;
        let sql = format!(
            "UPDATE agoragrams SET body = ?2, modified = ?3 WHERE id = ?1 RETURNING {}",
            agoragram_select("")
        );
        conn.query_row(&sql, rusqlite::params![id, body, ts], agoragram_from_row)
            .optional()?
            .ok_or_else(|| AgoraError::NotFound(format!("agoragram {}", id)))
    })
}

/// Tombstone the item; remove the document entirely when it has no children.
/// Never cascades to children or ancestor counters.
pub fn delete_agoragram(root: &Path, id: &str) -> Result<(), AgoraError> {
    let ts = time::now_epoch_z();
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);

    audit.with_conn(&db_path, id, "agora.delete", |conn| {
        ensure_schema(conn)?;
        let tombstoned: Option<(String, Option<String>)> = conn
            .query_row(
                "UPDATE agoragrams SET deleted = ?2, author = NULL, body = ''
                 WHERE id = ?1
                 RETURNING children, reply_to",
                rusqlite::params![id, ts],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (children_raw, reply_to) =
            tombstoned.ok_or_else(|| AgoraError::NotFound(format!("agoragram {}", id)))?;
        let children: Vec<ChildRef> = serde_json::from_str(&children_raw)?;
        if children.is_empty() {
            conn.execute("DELETE FROM agoragrams WHERE id = ?1", [id])?;
            // The document is gone; drop its entry from the parent's ranking
            // cache so the index names only children that still exist.
            if let Some(parent_id) = reply_to {
                conn.execute(
                    "UPDATE agoragrams SET children = (
                         SELECT COALESCE(json_group_array(json(value)), '[]')
                         FROM json_each(agoragrams.children)
                         WHERE json_extract(value, '$.id') <> ?2
                     ) WHERE id = ?1",
                    rusqlite::params![parent_id, id],
                )?;
            }
        }
        Ok(())
    })
}

pub fn get_agoragram(root: &Path, id: &str) -> Result<Option<Agoragram>, AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);
    audit.with_conn(&db_path, id, "agora.get", |conn| {
        ensure_schema(conn)?;
        fetch_agoragram(conn, id)
    })
}

pub fn get_by_short_id(root: &Path, short_id: &str) -> Result<Option<Agoragram>, AgoraError> {
    let audit = AuditLog::new(root);
    let db_path = store::agora_db_path(root);
    audit.with_conn(&db_path, short_id, "agora.get", |conn| {
        ensure_schema(conn)?;
        let sql = format!(
            "SELECT {} FROM agoragrams WHERE short_id = ?1",
            agoragram_select("")
        );
        conn.query_row(&sql, [short_id], agoragram_from_row)
            .optional()
            .map_err(AgoraError::Rusqlite)
    })
}

pub(crate) fn fetch_agoragram(
    conn: &Connection,
    id: &str,
) -> Result<Option<Agoragram>, AgoraError> {
    let sql = format!("SELECT {} FROM agoragrams WHERE id = ?1", agoragram_select(""));
    conn.query_row(&sql, [id], agoragram_from_row)
        .optional()
        .map_err(AgoraError::Rusqlite)
}
