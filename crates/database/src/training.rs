//! Sensor training data persistence.

use sqlx::SqlitePool;

use crate::models::TrainingSample;
use crate::Result;

/// Insert a batch of training samples in one transaction.
///
/// Returns the number of rows written.
pub async fn insert_samples(pool: &SqlitePool, samples: &[TrainingSample]) -> Result<u64> {
    if samples.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0;

    for sample in samples {
        let result = sqlx::query(
            r#"
            INSERT INTO sensor_training_data (user_id, sensor_type, x, y, z, timestamp, label, is_verified)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&sample.user_id)
        .bind(&sample.sensor_type)
        .bind(sample.x)
        .bind(sample.y)
        .bind(sample.z)
        .bind(sample.timestamp)
        .bind(sample.label)
        .bind(sample.is_verified)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

/// List a user's training samples in insertion order.
pub async fn list_user_samples(pool: &SqlitePool, user_id: &str) -> Result<Vec<TrainingSample>> {
    let rows = sqlx::query_as::<_, TrainingSample>(
        r#"
        SELECT user_id, sensor_type, x, y, z, timestamp, label, is_verified
        FROM sensor_training_data
        WHERE user_id = ?
        ORDER BY id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count all training samples.
pub async fn count_samples(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sensor_training_data")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
