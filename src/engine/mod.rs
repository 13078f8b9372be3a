//! The aggregation engine proper.
//!
//! `content` owns the post/comment tree and schema, `stars` the star ledger,
//! `notify` the notification fan-out and list operations, `query` the read
//! side, `users` the per-user aggregates, and `validate` the pre-engine input
//! gate.

pub mod content;
pub mod notify;
pub mod query;
pub mod stars;
pub mod users;
pub mod validate;
