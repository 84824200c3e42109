//! Feed assembly
//!
//! Turns one page of posts into feed entries with a fixed number of batched
//! lookups: one for every comment on the page, one for every profile the
//! page mentions (authors and commenters). Page size does not change the
//! query count.

use std::collections::{HashMap, HashSet};

use axum::async_trait;
use sqlx::SqliteConnection;

use crate::data::{Comment, Post, UserProfile, posts, users};
use crate::error::AppError;

/// A post with its author and comments resolved
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub post: Post,
    pub creator: UserProfile,
    pub comments: Vec<CommentEntry>,
}

/// A comment with its author resolved
#[derive(Debug, Clone)]
pub struct CommentEntry {
    pub comment: Comment,
    pub creator: UserProfile,
}

/// Batched lookups the assembler needs
#[async_trait]
pub trait FeedSource: Send {
    /// Every comment on any of `post_ids`, in display order
    async fn comments_for_posts(&mut self, post_ids: &[String])
    -> Result<Vec<Comment>, AppError>;

    /// Profiles for `user_ids`; unknown ids are left out
    async fn profiles_by_ids(
        &mut self,
        user_ids: &[String],
    ) -> Result<HashMap<String, UserProfile>, AppError>;
}

#[async_trait]
impl FeedSource for SqliteConnection {
    async fn comments_for_posts(
        &mut self,
        post_ids: &[String],
    ) -> Result<Vec<Comment>, AppError> {
        posts::comments_for_posts(self, post_ids).await
    }

    async fn profiles_by_ids(
        &mut self,
        user_ids: &[String],
    ) -> Result<HashMap<String, UserProfile>, AppError> {
        users::profiles_by_ids(self, user_ids).await
    }
}

/// Ids in first-seen order without duplicates
#[derive(Default)]
struct OrderedIds {
    seen: HashSet<String>,
    ids: Vec<String>,
}

impl OrderedIds {
    fn push(&mut self, id: &str) {
        if self.seen.insert(id.to_string()) {
            self.ids.push(id.to_string());
        }
    }
}

/// Build one entry per post, keeping the order of `posts`
///
/// A profile missing from the batch renders as `UserProfile::default()`
/// instead of failing the page. An empty page issues no lookups.
pub async fn assemble_feed<S>(source: &mut S, posts: Vec<Post>) -> Result<Vec<FeedEntry>, AppError>
where
    S: FeedSource + ?Sized,
{
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let mut post_ids = OrderedIds::default();
    let mut user_ids = OrderedIds::default();
    for post in &posts {
        post_ids.push(&post.id);
        user_ids.push(&post.user_id);
    }

    let mut comments_by_post: HashMap<String, Vec<Comment>> = HashMap::new();
    for comment in source.comments_for_posts(&post_ids.ids).await? {
        user_ids.push(&comment.user_id);
        comments_by_post
            .entry(comment.post_id.clone())
            .or_default()
            .push(comment);
    }

    let profiles = source.profiles_by_ids(&user_ids.ids).await?;
    let resolve = |user_id: &str| match profiles.get(user_id) {
        Some(profile) => profile.clone(),
        None => {
            tracing::warn!(user_id, "Profile missing while assembling feed");
            UserProfile::default()
        }
    };

    let entries = posts
        .into_iter()
        .map(|post| {
            let comments = comments_by_post
                .remove(&post.id)
                .unwrap_or_default()
                .into_iter()
                .map(|comment| CommentEntry {
                    creator: resolve(&comment.user_id),
                    comment,
                })
                .collect();

            FeedEntry {
                creator: resolve(&post.user_id),
                post,
                comments,
            }
        })
        .collect();

    Ok(entries)
}
