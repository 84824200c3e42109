//! Friend endpoints
//!
//! Add and remove friends, and the user directory.

use axum::{Json, extract::State};

use super::dto::{Envelope, FriendRequest, Meta, UserListQuery, UserResponse};
use super::extract::{ValidatedJson, ValidatedQuery};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;

/// POST /v1/friend
pub async fn add_friend(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<FriendRequest>,
) -> Result<Json<Envelope<()>>, AppError> {
    state.users.add_friend(&user.id, &req.user_id).await?;

    Ok(Json(Envelope::message("Friend added successfully")))
}

/// DELETE /v1/friend
pub async fn delete_friend(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<FriendRequest>,
) -> Result<Json<Envelope<()>>, AppError> {
    state.users.delete_friend(&user.id, &req.user_id).await?;

    Ok(Json(Envelope::message("Friend deleted successfully")))
}

/// GET /v1/friend
///
/// Directory listing; `onlyFriend=true` restricts to the caller's friends.
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedQuery(params): ValidatedQuery<UserListQuery>,
) -> Result<Json<Envelope<Vec<UserResponse>>>, AppError> {
    let filter = params.to_filter();
    let meta_limit = filter.effective_limit();
    let meta_offset = filter.offset;
    let page = state.users.list_users(&user.id, filter).await?;

    Ok(Json(Envelope::paged(
        page.items.into_iter().map(UserResponse::from).collect(),
        Meta {
            total: page.total,
            offset: meta_offset,
            limit: meta_limit,
        },
    )))
}
