//! Post store
//!
//! Posts, comments and the global post counter. Authorization for comments
//! happens in the service layer; nothing here checks it.

use sqlx::SqliteConnection;
use sqlx::types::Json;

use super::database::{Database, finish_transaction};
use super::filter::{PostFilter, json_array, search_text};
use super::models::{Comment, EntityId, Post};
use crate::error::AppError;
use crate::metrics::observe_db_query;

const SELECT_POSTS: &str =
    "SELECT p.id, p.user_id, p.body, p.tags, p.created_at, p.updated_at FROM posts p";

// =============================================================================
// Posts
// =============================================================================

/// Insert a post row
pub async fn insert_post(conn: &mut SqliteConnection, post: &Post) -> Result<(), AppError> {
    observe_db_query("insert", "posts");
    sqlx::query(
        r#"
        INSERT INTO posts (id, user_id, body, body_search, tags, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.id)
    .bind(&post.user_id)
    .bind(&post.body)
    .bind(search_text(&post.body))
    .bind(Json(&post.tags))
    .bind(post.created_at)
    .bind(post.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Bump the global counter, creating it at 1 if missing
pub async fn increment_post_counter(conn: &mut SqliteConnection) -> Result<(), AppError> {
    observe_db_query("upsert", "post_counter");
    sqlx::query(
        r#"
        INSERT INTO post_counter (id, count) VALUES (1, 1)
        ON CONFLICT(id) DO UPDATE SET count = count + 1
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert a post and bump the counter in one transaction
pub async fn create(db: &Database, post: &Post) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    let result: Result<(), AppError> = async {
        insert_post(&mut *tx, post).await?;
        increment_post_counter(&mut *tx).await?;
        Ok(())
    }
    .await;

    finish_transaction(tx, result, "create_post").await
}

/// Fetch one post
///
/// # Errors
/// `PostNotFound` when the id is malformed or no row matches.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Post, AppError> {
    let Some(id) = EntityId::parse(id) else {
        return Err(AppError::PostNotFound);
    };

    observe_db_query("select", "posts");
    let sql = format!("{SELECT_POSTS} WHERE p.id = ?");
    sqlx::query_as::<_, Post>(&sql)
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::PostNotFound)
}

/// Posts visible under `filter`, in feed order
pub async fn list_feed(
    conn: &mut SqliteConnection,
    filter: &PostFilter,
) -> Result<Vec<Post>, AppError> {
    let clauses = filter.build();
    let sql = clauses.apply_to(SELECT_POSTS);

    observe_db_query("select", "posts");
    let posts = sqlx::query_as_with::<_, Post, _>(&sql, clauses.arguments())
        .fetch_all(&mut *conn)
        .await?;

    Ok(posts)
}

/// Number of posts matching `filter`, ignoring its paging and ordering
pub async fn count_feed(conn: &mut SqliteConnection, filter: &PostFilter) -> Result<i64, AppError> {
    let clauses = filter.for_count().build();
    let sql = clauses.apply_to("SELECT COUNT(*) FROM posts p");

    observe_db_query("count", "posts");
    let count = sqlx::query_scalar_with::<_, i64, _>(&sql, clauses.arguments())
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}

/// Value of the global post counter
pub async fn post_count(conn: &mut SqliteConnection) -> Result<i64, AppError> {
    observe_db_query("select", "post_counter");
    let count: Option<i64> = sqlx::query_scalar("SELECT count FROM post_counter WHERE id = 1")
        .fetch_optional(&mut *conn)
        .await?;

    Ok(count.unwrap_or(0))
}

// =============================================================================
// Comments
// =============================================================================

/// Insert a comment row
pub async fn insert_comment(
    conn: &mut SqliteConnection,
    comment: &Comment,
) -> Result<(), AppError> {
    observe_db_query("insert", "post_comments");
    sqlx::query(
        r#"
        INSERT INTO post_comments (id, post_id, user_id, comment, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&comment.id)
    .bind(&comment.post_id)
    .bind(&comment.user_id)
    .bind(&comment.comment)
    .bind(comment.created_at)
    .bind(comment.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Every comment on any of `post_ids`, oldest first, in one query
pub async fn comments_for_posts(
    conn: &mut SqliteConnection,
    post_ids: &[String],
) -> Result<Vec<Comment>, AppError> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }

    observe_db_query("select", "post_comments");
    let comments = sqlx::query_as::<_, Comment>(
        r#"
        SELECT c.id, c.post_id, c.user_id, c.comment, c.created_at, c.updated_at
        FROM post_comments c
        WHERE c.post_id IN (SELECT value FROM json_each(?1))
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(json_array(post_ids))
    .fetch_all(&mut *conn)
    .await?;

    Ok(comments)
}
