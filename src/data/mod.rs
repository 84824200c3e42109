//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite pool, migrations and transaction helpers
//! - List filter builder shared by the feed and the user directory
//! - Store functions for users, friends and posts

mod database;
pub mod filter;
pub mod friends;
mod models;
pub mod posts;
pub mod users;

pub use database::{Database, finish_transaction};
pub use filter::{PostFilter, SortDirection, UserFilter, UserSortKey};
pub use models::*;

#[cfg(test)]
mod database_test;
