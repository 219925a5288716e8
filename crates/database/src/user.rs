//! User profile and account settings operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::User;

/// Create a new user.
pub async fn create_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, full_name, sos_message, fcm_token)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.full_name)
    .bind(&user.sos_message)
    .bind(&user.fcm_token)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "User",
                    id: user.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, full_name, sos_message, fcm_token
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Set or clear the user-level SOS message.
pub async fn set_sos_message(pool: &SqlitePool, id: &str, message: Option<&str>) -> Result<()> {
    let result = sqlx::query("UPDATE users SET sos_message = ? WHERE id = ?")
        .bind(message)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Set or clear the push token of the user's device.
pub async fn set_fcm_token(pool: &SqlitePool, id: &str, token: Option<&str>) -> Result<()> {
    let result = sqlx::query("UPDATE users SET fcm_token = ? WHERE id = ?")
        .bind(token)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Upsert the account-settings default SOS message.
pub async fn set_settings_message(pool: &SqlitePool, user_id: &str, message: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_settings (user_id, sos_message, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(user_id) DO UPDATE SET
            sos_message = excluded.sos_message,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id)
    .bind(message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get the account-settings default SOS message, if any.
pub async fn get_settings_message(pool: &SqlitePool, user_id: &str) -> Result<Option<String>> {
    let message = sqlx::query_scalar::<_, String>(
        r#"
        SELECT sos_message FROM user_settings WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(message)
}
