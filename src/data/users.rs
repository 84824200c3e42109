//! User directory store
//!
//! Users are never deleted. Email and phone are each unique; either may be
//! linked after registration, but only while still unset.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::database::{Database, finish_transaction, is_unique_violation};
use super::filter::{UserFilter, search_text};
use super::models::{CredentialType, EntityId, Page, ProfilePatch, User, UserProfile};
use crate::error::AppError;
use crate::metrics::observe_db_query;

const SELECT_USERS: &str = "SELECT id, email, phone, name, password, image_url, created_at, updated_at FROM users";

const SELECT_PROFILES: &str = r#"
    SELECT u.id, u.name, u.image_url, u.created_at,
        (SELECT COUNT(*) FROM friends fr
         WHERE fr.user_id_adder = u.id OR fr.user_id_added = u.id) AS friend_count
    FROM users u
"#;

// =============================================================================
// Accounts
// =============================================================================

/// Insert a newly registered user
///
/// # Errors
/// `CredentialTaken` when the email or phone belongs to someone else.
pub async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<(), AppError> {
    observe_db_query("insert", "users");
    sqlx::query(
        r#"
        INSERT INTO users (id, email, phone, name, name_search, password, image_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.name)
    .bind(search_text(&user.name))
    .bind(&user.password)
    .bind(&user.image_url)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|error| {
        if is_unique_violation(&error) {
            let field = if user.email.is_some() { "email" } else { "phone" };
            AppError::CredentialTaken(field)
        } else {
            AppError::Database(error)
        }
    })?;

    Ok(())
}

/// Fetch a user by id
///
/// # Errors
/// `UserNotFound` when the id is malformed or no row matches.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> Result<User, AppError> {
    let Some(id) = EntityId::parse(id) else {
        return Err(AppError::UserNotFound);
    };

    observe_db_query("select", "users");
    let sql = format!("{SELECT_USERS} WHERE id = ?");
    sqlx::query_as::<_, User>(&sql)
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::UserNotFound)
}

/// Fetch a user by email or phone
pub async fn get_by_credential(
    conn: &mut SqliteConnection,
    credential_type: CredentialType,
    value: &str,
) -> Result<User, AppError> {
    observe_db_query("select", "users");
    let sql = format!("{SELECT_USERS} WHERE {} = ?", credential_type.column());
    sqlx::query_as::<_, User>(&sql)
        .bind(value)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::UserNotFound)
}

/// Link a phone number to a user that has none yet
pub async fn update_phone(
    conn: &mut SqliteConnection,
    user_id: &str,
    phone: &str,
) -> Result<(), AppError> {
    link_credential(conn, user_id, CredentialType::Phone, phone).await
}

/// Link an email address to a user that has none yet
pub async fn update_email(
    conn: &mut SqliteConnection,
    user_id: &str,
    email: &str,
) -> Result<(), AppError> {
    link_credential(conn, user_id, CredentialType::Email, email).await
}

/// Set a credential column only while it is still NULL
///
/// # Errors
/// `AlreadyLinked` when the user already has one, `CredentialTaken` when
/// another user owns `value`, `UserNotFound` when the user is gone.
async fn link_credential(
    conn: &mut SqliteConnection,
    user_id: &str,
    credential_type: CredentialType,
    value: &str,
) -> Result<(), AppError> {
    let column = credential_type.column();

    observe_db_query("update", "users");
    let sql = format!(
        "UPDATE users SET {column} = ?, updated_at = ? WHERE id = ? AND {column} IS NULL"
    );
    let result = sqlx::query(&sql)
        .bind(value)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                AppError::CredentialTaken(credential_type.as_str())
            } else {
                AppError::Database(error)
            }
        })?;

    if result.rows_affected() == 0 {
        // Distinguish "already linked" from "no such user"
        get_by_id(conn, user_id).await?;
        return Err(AppError::AlreadyLinked(credential_type.as_str()));
    }

    Ok(())
}

/// Apply a profile patch; fields left as `None` are not touched
pub async fn update_profile(
    conn: &mut SqliteConnection,
    user_id: &str,
    patch: &ProfilePatch,
) -> Result<(), AppError> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET name = ");
    builder.push_bind(&patch.name);
    builder.push(", name_search = ");
    builder.push_bind(search_text(&patch.name));
    if let Some(image_url) = &patch.image_url {
        builder.push(", image_url = ");
        builder.push_bind(image_url);
    }
    builder.push(", updated_at = ");
    builder.push_bind(Utc::now());
    builder.push(" WHERE id = ");
    builder.push_bind(user_id);

    observe_db_query("update", "users");
    let result = builder.build().execute(&mut *conn).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::UserNotFound);
    }

    Ok(())
}

// =============================================================================
// Profiles
// =============================================================================

/// One page of profiles, ordered and paginated per `filter`
pub async fn list_profiles(
    conn: &mut SqliteConnection,
    filter: &UserFilter,
) -> Result<Vec<UserProfile>, AppError> {
    let clauses = filter.build();
    let sql = clauses.apply_to(SELECT_PROFILES);

    observe_db_query("select", "users");
    let profiles = sqlx::query_as_with::<_, UserProfile, _>(&sql, clauses.arguments())
        .fetch_all(&mut *conn)
        .await?;

    Ok(profiles)
}

/// Number of profiles matching `filter`, ignoring paging and ordering
pub async fn count_profiles(
    conn: &mut SqliteConnection,
    filter: &UserFilter,
) -> Result<i64, AppError> {
    let clauses = filter.for_count().build();
    let sql = clauses.apply_to("SELECT COUNT(*) FROM users u");

    observe_db_query("count", "users");
    let count = sqlx::query_scalar_with::<_, i64, _>(&sql, clauses.arguments())
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}

/// Page plus total, read inside one transaction so both see the same snapshot
pub async fn list(db: &Database, filter: &UserFilter) -> Result<Page<UserProfile>, AppError> {
    let mut tx = db.begin().await?;

    let result: Result<Page<UserProfile>, AppError> = async {
        let items = list_profiles(&mut *tx, filter).await?;
        let total = count_profiles(&mut *tx, filter).await?;
        Ok(Page { items, total })
    }
    .await;

    finish_transaction(tx, result, "list_users").await
}

/// Profiles for `user_ids` in one query, keyed by id
///
/// Ids with no matching row are simply absent from the map.
pub async fn profiles_by_ids(
    conn: &mut SqliteConnection,
    user_ids: &[String],
) -> Result<HashMap<String, UserProfile>, AppError> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let profiles = list_profiles(conn, &UserFilter::by_ids(user_ids.to_vec())).await?;

    Ok(profiles
        .into_iter()
        .map(|profile| (profile.id.clone(), profile))
        .collect())
}
