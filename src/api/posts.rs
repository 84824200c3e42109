//! Post endpoints
//!
//! Publishing, commenting and the feed.

use axum::{Json, extract::State, http::StatusCode};

use super::dto::{
    CreateCommentRequest, CreatePostRequest, CreatedResponse, Envelope, FeedEntryResponse,
    FeedQuery, Meta, format_timestamp,
};
use super::extract::{ValidatedJson, ValidatedQuery};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;

/// POST /v1/post
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<Envelope<CreatedResponse>>), AppError> {
    let post = state
        .posts
        .create_post(&user.id, req.post_in_html, req.tags)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Post created successfully",
            CreatedResponse {
                created_at: format_timestamp(&post.created_at),
                id: post.id,
            },
        )),
    ))
}

/// POST /v1/post/comment
///
/// Only the author and the author's friends may comment.
pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Envelope<CreatedResponse>>), AppError> {
    let comment = state
        .posts
        .create_comment(&user.id, &req.post_id, req.comment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Comment created successfully",
            CreatedResponse {
                created_at: format_timestamp(&comment.created_at),
                id: comment.id,
            },
        )),
    ))
}

/// GET /v1/post
pub async fn feed(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedQuery(params): ValidatedQuery<FeedQuery>,
) -> Result<Json<Envelope<Vec<FeedEntryResponse>>>, AppError> {
    let filter = params.to_filter();
    let meta_limit = filter.effective_limit();
    let meta_offset = filter.offset;
    let page = state.posts.feed(&user.id, filter).await?;

    Ok(Json(Envelope::paged(
        page.items.into_iter().map(FeedEntryResponse::from).collect(),
        Meta {
            total: page.total,
            offset: meta_offset,
            limit: meta_limit,
        },
    )))
}
