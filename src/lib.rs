//! Agora: a local-first content-and-interaction aggregation engine.
//!
//! Agora stores a tree of posts and comments in SQLite and maintains the
//! denormalized accounting around it: per-item star counts, per-post comment
//! totals, per-author score counters, and a ranked per-node children index.
//! Comment creation fans out notifications to the affected authors.
//!
//! # Consistency contract
//!
//! The store guarantees atomicity of a single-document update and nothing
//! more. Multi-document sequences (comment creation, star toggles) are
//! independently committed writes with no rollback; the engine defines an
//! eventual-consistency contract rather than linearizable counters. At
//! quiescence:
//!
//! - an item's star count equals the number of users holding it in their
//!   starred set (the set is the source of truth);
//! - a post's comment total equals the number of items pointing at it;
//! - every children index is sorted descending by stars and names exactly the
//!   live direct replies.
//!
//! The documented gaps (a dangling child stub when a comment document fails
//! after its stub landed, a lost-update window on concurrent re-ranks) are
//! deliberate trades for availability and are covered in the module docs of
//! `engine::content` and `engine::stars`.
//!
//! # Layout
//!
//! - `core`: connection setup, schema, errors, ids, audit log, config.
//! - `engine`: `content` (tree + accounting), `stars` (ledger), `notify`
//!   (fan-out + list operations), `query` (read side), `users` (aggregates),
//!   `validate` (input gate).

pub mod core;
pub mod engine;

mod cli;

pub use crate::core::error::AgoraError;

use crate::cli::{Cli, Command, NotificationsCommand, OutputFormat, UserCommand};
use crate::engine::content::{Agoragram, CommentDraft, PostDraft};
use crate::engine::query::FeedFilters;
use crate::engine::{content, notify, query, stars, users, validate};
use clap::Parser;
use std::env;

pub fn run() -> Result<(), AgoraError> {
    let cli = Cli::parse();
    let root = core::store::resolve_root(cli.dir.clone());

    if matches!(cli.command, Command::Init) {
        content::initialize_agora_db(&root)?;
        println!("Agora store initialized at {}", root.display());
        return Ok(());
    }

    if !core::store::agora_db_path(&root).is_file() {
        return Err(AgoraError::Validation(format!(
            "no store at {}; run `agora init` first",
            root.display()
        )));
    }

    let cfg = core::config::load(&root)?;
    let actor = || -> Result<String, AgoraError> {
        cli.actor
            .clone()
            .or_else(|| env::var("AGORA_USER_ID").ok().filter(|s| !s.is_empty()))
            .ok_or_else(|| {
                AgoraError::Validation(
                    "acting user required: pass --as or set AGORA_USER_ID".to_string(),
                )
            })
    };

    match &cli.command {
        Command::Init => unreachable!("handled above"),
        Command::User(user_cli) => match &user_cli.command {
            UserCommand::Add {
                username,
                first_name,
                last_name,
            } => {
                let user = users::create_user(&root, username, first_name, last_name)?;
                print_envelope("user.add", "ok", serde_json::json!({ "user": user }))
            }
            UserCommand::Get { id } => {
                let user = users::get_user(&root, id)?;
                let status = if user.is_some() { "ok" } else { "not_found" };
                print_envelope("user.get", status, serde_json::json!({ "user": user }))
            }
        },
        Command::Post {
            kind,
            title,
            body,
            tags,
            hypagora,
        } => {
            let author = actor()?;
            let draft = PostDraft {
                kind: (*kind).into(),
                title: title.clone(),
                body: body.clone(),
                tags: tags.clone(),
                hypagora: hypagora.clone(),
            };
            validate::validate_post(&draft, &cfg)?;
            let item = content::create_post(&root, &author, &draft)?;
            print_envelope("agora.post", "ok", serde_json::json!({ "item": item }))
        }
        Command::Comment { reply_to, body } => {
            let author = actor()?;
            let draft = CommentDraft {
                body: body.clone(),
                reply_to: reply_to.clone(),
            };
            validate::validate_comment(&draft, &cfg)?;
            let item = content::create_comment(&root, &author, &draft)?;
            print_envelope("agora.comment", "ok", serde_json::json!({ "item": item }))
        }
        Command::Star { id } => {
            let action = stars::toggle_star(&root, &actor()?, id)?;
            print_envelope(
                "agora.star",
                "ok",
                serde_json::json!({ "action": action, "agoragramID": id }),
            )
        }
        Command::Starred { ids } => {
            validate::validate_id_batch(ids, &cfg)?;
            let starred = stars::check_starred(&root, &actor()?, ids)?;
            let mut starred: Vec<String> = starred.into_iter().collect();
            starred.sort();
            print_envelope("agora.starred", "ok", serde_json::json!({ "starred": starred }))
        }
        Command::Edit { id, body } => {
            let item = content::update_body(&root, id, body)?;
            print_envelope("agora.edit", "ok", serde_json::json!({ "item": item }))
        }
        Command::Delete { id } => {
            content::delete_agoragram(&root, id)?;
            print_envelope("agora.delete", "ok", serde_json::json!({ "agoragramID": id }))
        }
        Command::Feed {
            sort,
            skip,
            limit,
            from_id,
            hypagora,
            author,
            format,
        } => {
            validate::validate_page(*limit, &cfg)?;
            let filters = FeedFilters {
                from_id: from_id.clone(),
                hypagora: hypagora.clone(),
                author_id: author.clone(),
            };
            let items = query::list_posts(&root, *sort, *skip, *limit, &filters)?;
            match format {
                OutputFormat::Json => {
                    print_envelope("agora.feed", "ok", serde_json::json!({ "items": items }))
                }
                OutputFormat::Text => {
                    render_feed(&items);
                    Ok(())
                }
            }
        }
        Command::Thread { handle } => {
            let items = query::get_subtree(&root, handle)?;
            print_envelope("agora.thread", "ok", serde_json::json!({ "items": items }))
        }
        Command::Notifications(ncli) => {
            let user = actor()?;
            match &ncli.command {
                NotificationsCommand::List { skip, limit } => {
                    validate::validate_page(*limit, &cfg)?;
                    let items = notify::list_notifications(&root, &user, *skip, *limit as usize)?;
                    print_envelope(
                        "notification.list",
                        "ok",
                        serde_json::json!({ "notifications": items }),
                    )
                }
                NotificationsCommand::Read { ids } => {
                    validate::validate_id_batch(ids, &cfg)?;
                    notify::mark_read(&root, &user, ids)?;
                    print_envelope("notification.read", "ok", serde_json::json!({}))
                }
                NotificationsCommand::ReadAll => {
                    notify::mark_all_read(&root, &user)?;
                    print_envelope("notification.read_all", "ok", serde_json::json!({}))
                }
                NotificationsCommand::Delete { ids } => {
                    validate::validate_id_batch(ids, &cfg)?;
                    notify::delete_notifications(&root, &user, ids)?;
                    print_envelope("notification.delete", "ok", serde_json::json!({}))
                }
                NotificationsCommand::DeleteAll => {
                    notify::delete_all_notifications(&root, &user)?;
                    print_envelope("notification.delete_all", "ok", serde_json::json!({}))
                }
                NotificationsCommand::DeleteRead => {
                    notify::delete_read_notifications(&root, &user)?;
                    print_envelope("notification.delete_read", "ok", serde_json::json!({}))
                }
            }
        }
    }
}

fn print_envelope(cmd: &str, status: &str, extra: serde_json::Value) -> Result<(), AgoraError> {
    let envelope = core::time::command_envelope(cmd, status, extra);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn render_feed(items: &[Agoragram]) {
    use colored::Colorize;

    if items.is_empty() {
        println!("(empty feed)");
        return;
    }
    for item in items {
        let author = item
            .author_details
            .as_ref()
            .map(|a| format!("@{}", a.username))
            .unwrap_or_else(|| "[deleted]".to_string());
        let title = item.title.as_deref().unwrap_or("(untitled)");
        println!(
            "{:>5} {} {}  {} {}",
            format!("★{}", item.stars).yellow(),
            item.short_id.bright_cyan(),
            title.bold(),
            author.dimmed(),
            format!("({} comments)", item.comment_amount.unwrap_or(0)).dimmed()
        );
    }
}
