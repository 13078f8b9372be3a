//! CLI struct definitions for the agora command-line interface.
//!
//! All clap-derived types live here; dispatch logic lives in `lib.rs`.

use crate::engine::content::ItemKind;
use crate::engine::query::FeedSort;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "agora",
    version = env!("CARGO_PKG_VERSION"),
    about = "Agora is a local-first content-and-interaction aggregation engine: a post/comment tree with denormalized star and comment accounting, a ranked children index, and notification fan-out."
)]
pub(crate) struct Cli {
    /// Store root directory (defaults to $AGORA_HOME, then ./.agora/data).
    #[clap(long, global = true)]
    pub dir: Option<PathBuf>,
    /// Acting user id (defaults to $AGORA_USER_ID).
    #[clap(long = "as", global = true, value_name = "USER_ID")]
    pub actor: Option<String>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum PostKind {
    Text,
    Link,
    Question,
}

impl From<PostKind> for ItemKind {
    fn from(kind: PostKind) -> Self {
        match kind {
            PostKind::Text => ItemKind::Text,
            PostKind::Link => ItemKind::Link,
            PostKind::Question => ItemKind::Question,
        }
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Initialize a store at the root directory.
    Init,
    /// User aggregate operations.
    User(UserCli),
    /// Create a post.
    Post {
        #[clap(long, value_enum, default_value = "text")]
        kind: PostKind,
        #[clap(long)]
        title: String,
        #[clap(long, default_value = "")]
        body: String,
        /// Repeatable; at most five.
        #[clap(long = "tag")]
        tags: Vec<String>,
        #[clap(long)]
        hypagora: Option<String>,
    },
    /// Reply to a post or comment.
    Comment {
        #[clap(long = "reply-to")]
        reply_to: String,
        #[clap(long)]
        body: String,
    },
    /// Toggle a star on an item.
    Star {
        #[clap(long)]
        id: String,
    },
    /// Which of the given items the acting user has starred.
    Starred {
        #[clap(long = "id", required = true)]
        ids: Vec<String>,
    },
    /// Replace an item's body.
    Edit {
        #[clap(long)]
        id: String,
        #[clap(long)]
        body: String,
    },
    /// Delete an item: removed when childless, tombstoned otherwise.
    Delete {
        #[clap(long)]
        id: String,
    },
    /// Paginated post feed.
    Feed {
        #[clap(long, value_enum, default_value = "new")]
        sort: FeedSort,
        #[clap(long, default_value_t = 0)]
        skip: u32,
        #[clap(long, default_value_t = 25)]
        limit: u32,
        /// Cursor primitive: restrict to id >= from-id.
        #[clap(long = "from-id")]
        from_id: Option<String>,
        #[clap(long)]
        hypagora: Option<String>,
        #[clap(long)]
        author: Option<String>,
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// A root item plus all of its descendants.
    Thread {
        #[clap(value_name = "ID_OR_SHORT_ID")]
        handle: String,
    },
    /// Notification list operations for the acting user.
    Notifications(NotificationsCli),
}

#[derive(clap::Args, Debug)]
pub(crate) struct UserCli {
    #[clap(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum UserCommand {
    /// Create a user aggregate row.
    Add {
        #[clap(long)]
        username: String,
        #[clap(long = "first-name", default_value = "")]
        first_name: String,
        #[clap(long = "last-name", default_value = "")]
        last_name: String,
    },
    /// Show a user row.
    Get {
        #[clap(long)]
        id: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct NotificationsCli {
    #[clap(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum NotificationsCommand {
    /// Newest-first page of the acting user's notifications.
    List {
        #[clap(long, default_value_t = 0)]
        skip: usize,
        #[clap(long, default_value_t = 25)]
        limit: u32,
    },
    /// Mark specific notifications read.
    Read {
        #[clap(long = "id", required = true)]
        ids: Vec<String>,
    },
    /// Mark everything read.
    ReadAll,
    /// Delete specific notifications.
    Delete {
        #[clap(long = "id", required = true)]
        ids: Vec<String>,
    },
    /// Delete everything.
    DeleteAll,
    /// Delete only the already-read ones.
    DeleteRead,
}
