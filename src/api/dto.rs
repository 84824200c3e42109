//! Request and response DTOs
//!
//! JSON field names are camelCase. Every timestamp leaving the API goes
//! through [`format_timestamp`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{
    CredentialType, PostFilter, SortDirection, User, UserFilter, UserProfile, UserSortKey,
};
use crate::service::{CommentEntry, FeedEntry, Session};
use crate::validation::{FieldRules, Rule, Validate};

const CREDENTIAL_TYPES: &[&str] = &["email", "phone"];
const SORT_KEYS: &[&str] = &["createdAt", "friendCount"];
const SORT_DIRECTIONS: &[&str] = &["asc", "desc"];

/// Wire format for timestamps, always UTC
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// =============================================================================
// Envelope
// =============================================================================

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            message: None,
            data: Some(data),
            meta: None,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: Some(message.into()),
            data: Some(data),
            meta: None,
        }
    }

    pub fn paged(data: T, meta: Meta) -> Self {
        Self {
            message: None,
            data: Some(data),
            meta: Some(meta),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            data: None,
            meta: None,
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

// =============================================================================
// Users
// =============================================================================

/// POST /v1/user/register
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub credential_type: String,
    pub credential_value: String,
    pub name: String,
    pub password: String,
}

/// Rules for a credential value depend on its declared type
fn credential_value_rules(credential_type: &str) -> &'static [Rule] {
    match CredentialType::parse(credential_type) {
        Some(CredentialType::Email) => &[Rule::Required, Rule::Email],
        Some(CredentialType::Phone) => &[Rule::Required, Rule::Phone],
        None => &[Rule::Required],
    }
}

impl Validate for RegisterRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new(
                "credentialType",
                &self.credential_type,
                &[Rule::Required, Rule::OneOf(CREDENTIAL_TYPES)],
            ),
            FieldRules::new(
                "credentialValue",
                &self.credential_value,
                credential_value_rules(&self.credential_type),
            ),
            FieldRules::new(
                "name",
                &self.name,
                &[Rule::Required, Rule::Length { min: 5, max: 50 }],
            ),
            FieldRules::new(
                "password",
                &self.password,
                &[Rule::Required, Rule::Length { min: 5, max: 15 }],
            ),
        ]
    }
}

/// POST /v1/user/login
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    pub credential_type: String,
    pub credential_value: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new(
                "credentialType",
                &self.credential_type,
                &[Rule::Required, Rule::OneOf(CREDENTIAL_TYPES)],
            ),
            FieldRules::new(
                "credentialValue",
                &self.credential_value,
                credential_value_rules(&self.credential_type),
            ),
            FieldRules::new(
                "password",
                &self.password,
                &[Rule::Required, Rule::Length { min: 5, max: 15 }],
            ),
        ]
    }
}

/// Register and login response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub name: String,
    pub access_token: String,
}

impl AuthResponse {
    /// Registration echoes only the credential that was used
    pub fn registered(session: Session) -> Self {
        Self {
            email: session.user.email,
            phone: session.user.phone,
            name: session.user.name,
            access_token: session.access_token,
        }
    }

    /// Login always carries both credentials, empty when unset
    pub fn logged_in(session: Session) -> Self {
        Self {
            email: Some(session.user.email.unwrap_or_default()),
            phone: Some(session.user.phone.unwrap_or_default()),
            name: session.user.name,
            access_token: session.access_token,
        }
    }
}

/// PATCH /v1/user
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: String,
    pub image_url: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new(
                "name",
                &self.name,
                &[Rule::Required, Rule::Length { min: 5, max: 50 }],
            ),
            FieldRules::new("imageUrl", &self.image_url, &[Rule::Url]),
        ]
    }
}

/// POST /v1/user/link
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkEmailRequest {
    pub email: String,
}

impl Validate for LinkEmailRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![FieldRules::new(
            "email",
            &self.email,
            &[Rule::Required, Rule::Email],
        )]
    }
}

/// POST /v1/user/link/phone
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkPhoneRequest {
    pub phone: String,
}

impl Validate for LinkPhoneRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![FieldRules::new(
            "phone",
            &self.phone,
            &[Rule::Required, Rule::Phone],
        )]
    }
}

/// Public profile as listed in the directory and embedded in feed entries
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: String,
    pub name: String,
    pub image_url: String,
    pub friend_count: i64,
    pub created_at: String,
}

impl From<UserProfile> for UserResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.id,
            name: profile.name,
            image_url: profile.image_url.unwrap_or_default(),
            friend_count: profile.friend_count,
            created_at: profile
                .created_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_default(),
        }
    }
}

/// The caller's own account after an update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub image_url: String,
    pub updated_at: String,
}

impl From<User> for AccountResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
            email: user.email.unwrap_or_default(),
            phone: user.phone.unwrap_or_default(),
            image_url: user.image_url.unwrap_or_default(),
            updated_at: format_timestamp(&user.updated_at),
        }
    }
}

// =============================================================================
// Friends
// =============================================================================

/// POST and DELETE /v1/friend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FriendRequest {
    pub user_id: String,
}

impl Validate for FriendRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![FieldRules::new("userId", &self.user_id, &[Rule::Required])]
    }
}

/// GET /v1/friend query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserListQuery {
    pub limit: i64,
    pub offset: i64,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order_by: Option<String>,
    pub only_friend: bool,
}

impl Validate for UserListQuery {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new("sortBy", &self.sort_by, &[Rule::OneOf(SORT_KEYS)]),
            FieldRules::new("orderBy", &self.order_by, &[Rule::OneOf(SORT_DIRECTIONS)]),
        ]
    }
}

impl UserListQuery {
    pub fn to_filter(&self) -> UserFilter {
        UserFilter {
            only_friend: self.only_friend,
            search: self.search.clone(),
            sort_by: self
                .sort_by
                .as_deref()
                .and_then(UserSortKey::parse)
                .unwrap_or_default(),
            order_by: self
                .order_by
                .as_deref()
                .and_then(SortDirection::parse)
                .unwrap_or_default(),
            limit: self.limit,
            offset: self.offset.max(0),
            ..UserFilter::default()
        }
    }
}

// =============================================================================
// Posts
// =============================================================================

/// POST /v1/post
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub post_in_html: String,
    pub tags: Vec<String>,
}

impl Validate for CreatePostRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new(
                "postInHtml",
                &self.post_in_html,
                &[Rule::Required, Rule::MinLength(3)],
            ),
            FieldRules::new("tags", &self.tags, &[Rule::Required, Rule::EachNonBlank]),
        ]
    }
}

/// POST /v1/post/comment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub comment: String,
}

impl Validate for CreateCommentRequest {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        vec![
            FieldRules::new("postId", &self.post_id, &[Rule::Required]),
            FieldRules::new("comment", &self.comment, &[Rule::Required]),
        ]
    }
}

/// GET /v1/post query string; `searchTag` may repeat
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedQuery {
    pub limit: i64,
    pub offset: i64,
    pub search: Option<String>,
    pub search_tag: Vec<String>,
}

impl Validate for FeedQuery {
    fn field_rules(&self) -> Vec<FieldRules<'_>> {
        // Blank tags are dropped in `to_filter`, so nothing can fail here
        Vec::new()
    }
}

impl FeedQuery {
    pub fn to_filter(&self) -> PostFilter {
        PostFilter {
            search: self.search.clone(),
            search_tags: self
                .search_tag
                .iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
            limit: self.limit,
            offset: self.offset.max(0),
            ..PostFilter::default()
        }
    }
}

/// Post body inside a feed entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBody {
    pub post_in_html: String,
    pub tags: Vec<String>,
    pub created_at: String,
}

/// Comment inside a feed entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub comment: String,
    pub creator: UserResponse,
    pub created_at: String,
}

impl From<CommentEntry> for CommentResponse {
    fn from(entry: CommentEntry) -> Self {
        Self {
            created_at: format_timestamp(&entry.comment.created_at),
            comment: entry.comment.comment,
            creator: entry.creator.into(),
        }
    }
}

/// One feed entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntryResponse {
    pub post_id: String,
    pub post: PostBody,
    pub comments: Vec<CommentResponse>,
    pub creator: UserResponse,
}

impl From<FeedEntry> for FeedEntryResponse {
    fn from(entry: FeedEntry) -> Self {
        Self {
            post_id: entry.post.id,
            post: PostBody {
                created_at: format_timestamp(&entry.post.created_at),
                post_in_html: entry.post.body,
                tags: entry.post.tags,
            },
            comments: entry.comments.into_iter().map(Into::into).collect(),
            creator: entry.creator.into(),
        }
    }
}

/// Created post or comment id
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub id: String,
    pub created_at: String,
}

/// POST /v1/image
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_url: String,
}
