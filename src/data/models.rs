//! Data models
//!
//! Rust structs representing database rows.
//! All models use UUIDv7 text ids and chrono for timestamps.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (UUIDv7, hyphenated lowercase)
///
/// Version 7 ids are time-ordered, so sorting by id approximates sorting by
/// creation time.
///
/// Example: "01890a5d-ac96-774b-bcce-b302099a8057"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new UUIDv7
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Parse and normalize an id supplied by a client.
    ///
    /// Returns `None` for anything that is not a well-formed UUID.
    pub fn parse(raw: &str) -> Option<Self> {
        uuid::Uuid::parse_str(raw.trim())
            .ok()
            .map(|id| Self(id.hyphenated().to_string()))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered user
///
/// Exactly one of `email`/`phone` is set at registration; the other can be
/// linked later, once. Not serializable; the password hash stays out of
/// responses and `Debug` output.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: String,
    /// Argon2 PHC string
    pub password: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("name", &self.name)
            .field("password", &"[redacted]")
            .field("image_url", &self.image_url)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Credential kind used for registration and login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialType {
    Email,
    Phone,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            _ => None,
        }
    }

    /// Column holding this credential
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

/// Public profile as rendered in lists and feeds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub friend_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial profile update; `None` fields are left untouched
#[derive(Debug, Clone)]
pub struct ProfilePatch {
    pub name: String,
    pub image_url: Option<String>,
}

// =============================================================================
// Post
// =============================================================================

/// A post
///
/// Tags are persisted as a JSON array in a text column.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub body: String,
    #[sqlx(json)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment on a post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A page of rows plus the total matching the same filter
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}
