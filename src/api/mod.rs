//! API layer
//!
//! HTTP handlers for:
//! - Users: registration, login, profile, credential linking
//! - Friends: add, remove, directory
//! - Posts: publish, comment, feed
//! - Images: upload
//! - Metrics (Prometheus)
//! - Request ids

mod dto;
mod extract;
mod friends;
mod images;
pub mod metrics;
mod posts;
pub mod request_id;
mod users;

pub use dto::*;
pub use extract::{ValidatedJson, ValidatedQuery};
pub use metrics::{metrics_router, track_http_metrics};
pub use request_id::{MakeRequestUuidV7, REQUEST_ID_HEADER, request_span};

use axum::{
    Router,
    routing::{patch, post},
};

use crate::AppState;

/// Versioned API routes
///
/// Everything except registration and login requires a bearer token.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/v1/user/register", post(users::register))
        .route("/v1/user/login", post(users::login))
        .route("/v1/user", patch(users::update_profile))
        .route("/v1/user/link", post(users::link_email))
        .route("/v1/user/link/phone", post(users::link_phone))
        .route(
            "/v1/friend",
            post(friends::add_friend)
                .delete(friends::delete_friend)
                .get(friends::list_users),
        )
        .route("/v1/post", post(posts::create_post).get(posts::feed))
        .route("/v1/post/comment", post(posts::create_comment))
        .route("/v1/image", post(images::upload_image))
}
