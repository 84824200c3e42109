//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate store calls, authorization rules and token minting.

pub mod feed;
mod post;
mod user;

pub use feed::{CommentEntry, FeedEntry, FeedSource, assemble_feed};
pub use post::PostService;
pub use user::{Session, UserService};
