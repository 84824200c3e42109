//! User service
//!
//! Registration, login, the friend graph and profile maintenance.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::{mint_token, password};
use crate::config::AuthConfig;
use crate::data::{
    CredentialType, Database, EntityId, Page, ProfilePatch, User, UserFilter, UserProfile,
    friends, users,
};
use crate::error::AppError;
use crate::metrics::USERS_REGISTERED_TOTAL;

/// A user together with a freshly minted access token
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
}

/// User service
pub struct UserService {
    db: Arc<Database>,
    auth: AuthConfig,
}

impl UserService {
    /// Create new user service
    pub fn new(db: Arc<Database>, auth: AuthConfig) -> Self {
        Self { db, auth }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Register with exactly one credential
    ///
    /// # Errors
    /// `CredentialTaken` when the email or phone is already registered.
    pub async fn register(
        &self,
        credential_type: CredentialType,
        credential_value: String,
        name: String,
        plain_password: String,
    ) -> Result<Session, AppError> {
        let password_hash =
            password::hash_password_blocking(plain_password, self.auth.hash_cost).await?;

        let now = Utc::now();
        let (email, phone) = match credential_type {
            CredentialType::Email => (Some(credential_value), None),
            CredentialType::Phone => (None, Some(credential_value)),
        };
        let user = User {
            id: EntityId::new().0,
            email,
            phone,
            name,
            password: password_hash,
            image_url: None,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.db.acquire().await?;
        users::insert_user(&mut conn, &user).await?;
        USERS_REGISTERED_TOTAL
            .with_label_values(&[credential_type.as_str()])
            .inc();

        tracing::info!(user_id = %user.id, credential_type = credential_type.as_str(), "User registered");

        let access_token = mint_token(&user.id, &user.name, &self.auth)?;
        Ok(Session { user, access_token })
    }

    /// Log in with a credential and password
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown credential or a wrong password,
    /// without saying which.
    pub async fn login(
        &self,
        credential_type: CredentialType,
        credential_value: &str,
        plain_password: String,
    ) -> Result<Session, AppError> {
        let mut conn = self.db.acquire().await?;
        let user = match users::get_by_credential(&mut conn, credential_type, credential_value)
            .await
        {
            Ok(user) => user,
            Err(AppError::UserNotFound) => return Err(AppError::InvalidCredentials),
            Err(error) => return Err(error),
        };
        drop(conn);

        if !password::verify_password_blocking(plain_password, user.password.clone()).await? {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let access_token = mint_token(&user.id, &user.name, &self.auth)?;
        Ok(Session { user, access_token })
    }

    /// Fetch a user by id
    pub async fn get_user(&self, user_id: &str) -> Result<User, AppError> {
        let mut conn = self.db.acquire().await?;
        users::get_by_id(&mut conn, user_id).await
    }

    /// Link an email to a user registered by phone
    pub async fn link_email(&self, user_id: &str, email: &str) -> Result<User, AppError> {
        let mut conn = self.db.acquire().await?;
        users::update_email(&mut conn, user_id, email).await?;
        tracing::info!(user_id, "Email linked");
        users::get_by_id(&mut conn, user_id).await
    }

    /// Link a phone number to a user registered by email
    pub async fn link_phone(&self, user_id: &str, phone: &str) -> Result<User, AppError> {
        let mut conn = self.db.acquire().await?;
        users::update_phone(&mut conn, user_id, phone).await?;
        tracing::info!(user_id, "Phone linked");
        users::get_by_id(&mut conn, user_id).await
    }

    /// Update name and, when given, the profile image
    pub async fn update_profile(&self, user_id: &str, patch: ProfilePatch) -> Result<User, AppError> {
        let mut conn = self.db.acquire().await?;
        users::update_profile(&mut conn, user_id, &patch).await?;
        users::get_by_id(&mut conn, user_id).await
    }

    // =========================================================================
    // Friends
    // =========================================================================

    /// Befriend `target_id`
    ///
    /// # Errors
    /// `SelfFriend`, `UserNotFound` or `AlreadyFriends`.
    pub async fn add_friend(&self, user_id: &str, target_id: &str) -> Result<(), AppError> {
        let target = self.resolve_friend_target(user_id, target_id).await?;

        let mut conn = self.db.acquire().await?;
        friends::add_friend(&mut conn, user_id, &target).await?;

        tracing::info!(user_id, friend_id = %target, "Friend added");
        Ok(())
    }

    /// Unfriend `target_id`
    ///
    /// # Errors
    /// `SelfFriend`, `UserNotFound` or `NotFriends`.
    pub async fn delete_friend(&self, user_id: &str, target_id: &str) -> Result<(), AppError> {
        let target = self.resolve_friend_target(user_id, target_id).await?;

        let mut conn = self.db.acquire().await?;
        friends::delete_friend(&mut conn, user_id, &target).await?;

        tracing::info!(user_id, friend_id = %target, "Friend removed");
        Ok(())
    }

    /// Normalize the target id and make sure it names another, existing user
    async fn resolve_friend_target(&self, user_id: &str, target_id: &str) -> Result<String, AppError> {
        let target = EntityId::parse(target_id).ok_or(AppError::UserNotFound)?;
        if target.0 == user_id {
            return Err(AppError::SelfFriend);
        }

        let mut conn = self.db.acquire().await?;
        users::get_by_id(&mut conn, &target.0).await?;

        Ok(target.0)
    }

    /// True when both users are friends
    pub async fn is_friend(&self, a: &str, b: &str) -> Result<bool, AppError> {
        let mut conn = self.db.acquire().await?;
        friends::is_friend(&mut conn, a, b).await
    }

    /// Directory page for `viewer`
    ///
    /// `only_friend` restricts to the viewer's friends. Page and total are
    /// read in one transaction.
    pub async fn list_users(
        &self,
        viewer: &str,
        mut filter: UserFilter,
    ) -> Result<Page<UserProfile>, AppError> {
        filter.user_id = Some(viewer.to_string());
        users::list(&self.db, &filter).await
    }
}
