//! Database schema definitions for the Agora store.
//!
//! One SQLite database holds both document collections:
//! 1. `agoragrams`: the post/comment tree, rows-as-documents. Nested structures
//!    (the ranked children index) are JSON1 columns so a single UPDATE is the
//!    per-document atomic read-modify-write the engine's consistency contract
//!    assumes.
//! 2. `users`: user aggregates. The starred-item set and the embedded
//!    notification list are JSON1 columns for the same reason.

pub const AGORA_DB_NAME: &str = "agora.db";
pub const AGORA_EVENTS_NAME: &str = "agora.events.jsonl";

pub const AGORA_SCHEMA_VERSION: u32 = 1;

pub const AGORA_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

// `short_id` carries the store-level uniqueness constraint the generator
// retries against. `children` is the materialized ranking cache, one entry per
// direct reply, kept sorted descending by stars. `comment_amount` is NULL for
// comments, a denormalized descendant count for posts.
pub const AGORA_DB_SCHEMA_AGORAGRAMS: &str = "
    CREATE TABLE IF NOT EXISTS agoragrams (
        id TEXT PRIMARY KEY,
        short_id TEXT NOT NULL UNIQUE,
        kind TEXT NOT NULL,
        author TEXT,
        title TEXT,
        body TEXT NOT NULL DEFAULT '',
        tags TEXT,
        hypagora TEXT,
        stars INTEGER NOT NULL DEFAULT 0,
        comment_amount INTEGER,
        children TEXT NOT NULL DEFAULT '[]',
        post_id TEXT,
        post_short_id TEXT,
        reply_to TEXT,
        created_at TEXT NOT NULL,
        modified TEXT,
        pinned TEXT,
        deleted TEXT
    )
";

pub const AGORA_DB_SCHEMA_INDEX_STARS: &str =
    "CREATE INDEX IF NOT EXISTS idx_agoragrams_kind_stars ON agoragrams(kind, stars DESC)";
pub const AGORA_DB_SCHEMA_INDEX_POST: &str =
    "CREATE INDEX IF NOT EXISTS idx_agoragrams_post ON agoragrams(post_id)";
pub const AGORA_DB_SCHEMA_INDEX_AUTHOR: &str =
    "CREATE INDEX IF NOT EXISTS idx_agoragrams_author ON agoragrams(author)";

// `starred` is the authoritative star ledger: aggregate star counts are derived
// from it, never the other way around.
pub const AGORA_DB_SCHEMA_USERS: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        score_posts INTEGER NOT NULL DEFAULT 0,
        score_comments INTEGER NOT NULL DEFAULT 0,
        score_stars INTEGER NOT NULL DEFAULT 0,
        starred TEXT NOT NULL DEFAULT '[]',
        notifications TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    )
";
