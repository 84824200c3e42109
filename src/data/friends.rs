//! Friend graph
//!
//! Edges are symmetric. `friends` stores each pair once, in whichever
//! direction it was created; the `idx_friends_pair` unique index over
//! `(MIN, MAX)` rejects a second edge in either direction.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::SqliteConnection;

use super::database::{is_check_violation, is_unique_violation};
use super::filter::friends_of_subquery;
use crate::error::AppError;
use crate::metrics::observe_db_query;

/// True when an edge exists between `a` and `b` in either direction
pub async fn is_friend(conn: &mut SqliteConnection, a: &str, b: &str) -> Result<bool, AppError> {
    observe_db_query("select", "friends");
    let exists: i64 = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM friends
            WHERE (user_id_adder = ?1 AND user_id_added = ?2)
               OR (user_id_adder = ?2 AND user_id_added = ?1)
        )
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists != 0)
}

/// Create the edge `adder -> added`
///
/// # Errors
/// `SelfFriend` without touching storage when both ids match,
/// `AlreadyFriends` when an edge already exists in either direction.
pub async fn add_friend(
    conn: &mut SqliteConnection,
    adder: &str,
    added: &str,
) -> Result<(), AppError> {
    if adder == added {
        return Err(AppError::SelfFriend);
    }

    observe_db_query("insert", "friends");
    sqlx::query("INSERT INTO friends (user_id_adder, user_id_added, created_at) VALUES (?, ?, ?)")
        .bind(adder)
        .bind(added)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                AppError::AlreadyFriends
            } else if is_check_violation(&error) {
                AppError::SelfFriend
            } else {
                tracing::error!(%error, adder, added, "Failed to insert friend edge");
                AppError::Database(error)
            }
        })?;

    Ok(())
}

/// Remove the edge between `adder` and `added`, whichever side created it
///
/// # Errors
/// `SelfFriend` when both ids match, `NotFriends` when nothing was deleted.
pub async fn delete_friend(
    conn: &mut SqliteConnection,
    adder: &str,
    added: &str,
) -> Result<(), AppError> {
    if adder == added {
        return Err(AppError::SelfFriend);
    }

    observe_db_query("delete", "friends");
    let result = sqlx::query(
        r#"
        DELETE FROM friends
        WHERE (user_id_adder = ?1 AND user_id_added = ?2)
           OR (user_id_adder = ?2 AND user_id_added = ?1)
        "#,
    )
    .bind(adder)
    .bind(added)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFriends);
    }

    Ok(())
}

/// Ids of every user befriended with `user_id`
pub async fn friends_of(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<HashSet<String>, AppError> {
    observe_db_query("select", "friends");
    let sql = friends_of_subquery(1);
    let ids: Vec<String> = sqlx::query_scalar(&sql)
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(ids.into_iter().collect())
}
