//! Post service
//!
//! Posting, commenting and the friend-scoped feed.

use std::sync::Arc;

use chrono::Utc;

use super::feed::{FeedEntry, assemble_feed};
use crate::data::{Comment, Database, EntityId, Page, Post, PostFilter, friends, posts};
use crate::error::AppError;
use crate::metrics::{COMMENTS_CREATED_TOTAL, POSTS_CREATED_TOTAL};

/// Post service
pub struct PostService {
    db: Arc<Database>,
}

impl PostService {
    /// Create new post service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Publish a post as `user_id`
    ///
    /// The post row and the global counter are written in one transaction.
    pub async fn create_post(
        &self,
        user_id: &str,
        body: String,
        tags: Vec<String>,
    ) -> Result<Post, AppError> {
        let now = Utc::now();
        let post = Post {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            body,
            tags,
            created_at: now,
            updated_at: now,
        };

        posts::create(&self.db, &post).await?;
        POSTS_CREATED_TOTAL.inc();

        tracing::info!(post_id = %post.id, user_id, tags = post.tags.len(), "Post created");

        Ok(post)
    }

    /// Comment on a post as `user_id`
    ///
    /// # Errors
    /// `PostNotFound` for an unknown post, `NotFriendOfAuthor` unless the
    /// commenter wrote the post or is friends with its author.
    pub async fn create_comment(
        &self,
        user_id: &str,
        post_id: &str,
        text: String,
    ) -> Result<Comment, AppError> {
        let mut conn = self.db.acquire().await?;

        let post = posts::get_by_id(&mut conn, post_id).await?;
        if post.user_id != user_id && !friends::is_friend(&mut conn, user_id, &post.user_id).await?
        {
            tracing::debug!(post_id = %post.id, user_id, "Comment rejected: not a friend of the author");
            return Err(AppError::NotFriendOfAuthor);
        }

        let now = Utc::now();
        let comment = Comment {
            id: EntityId::new().0,
            post_id: post.id,
            user_id: user_id.to_string(),
            comment: text,
            created_at: now,
            updated_at: now,
        };
        posts::insert_comment(&mut conn, &comment).await?;
        COMMENTS_CREATED_TOTAL.inc();

        tracing::info!(comment_id = %comment.id, post_id = %comment.post_id, user_id, "Comment created");

        Ok(comment)
    }

    /// One feed page for `viewer` plus the total matching the filter
    ///
    /// Visibility is always scoped to the viewer and their friends.
    /// Four queries per page: posts, count, comments, profiles.
    pub async fn feed(
        &self,
        viewer: &str,
        mut filter: PostFilter,
    ) -> Result<Page<FeedEntry>, AppError> {
        filter.user_id = Some(viewer.to_string());

        let mut conn = self.db.acquire().await?;
        let page = posts::list_feed(&mut conn, &filter).await?;
        let total = posts::count_feed(&mut conn, &filter).await?;
        let items = assemble_feed(&mut *conn, page).await?;

        Ok(Page { items, total })
    }

    /// Global number of posts ever created
    pub async fn post_count(&self) -> Result<i64, AppError> {
        let mut conn = self.db.acquire().await?;
        posts::post_count(&mut conn).await
    }
}
