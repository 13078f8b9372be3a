//! Core primitives shared by every engine module.
//!
//! Connection setup, schema constants, error taxonomy, id/timestamp helpers,
//! the mutation audit log, and store-root resolution live here.

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod schemas;
pub mod shortid;
pub mod store;
pub mod time;
