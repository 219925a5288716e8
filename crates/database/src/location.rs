//! Last-known location lookups.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::Location;
use crate::Result;

/// Record a position for a user.
pub async fn record_location(
    pool: &SqlitePool,
    user_id: &str,
    latitude: f64,
    longitude: f64,
    recorded_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO locations (user_id, latitude, longitude, recorded_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(latitude)
    .bind(longitude)
    .bind(recorded_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent recorded position of a user.
pub async fn last_location(pool: &SqlitePool, user_id: &str) -> Result<Option<Location>> {
    let location = sqlx::query_as::<_, Location>(
        r#"
        SELECT user_id, latitude, longitude, recorded_at
        FROM locations
        WHERE user_id = ?
        ORDER BY recorded_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(location)
}
