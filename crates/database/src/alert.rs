//! SOS alert persistence.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Alert, AlertRow, AlertStatus};

const ALERT_COLUMNS: &str = "id, user_id, trigger_type, latitude, longitude, address, status, \
     sos_message, contacted_numbers, triggered_at, sent_at, resolved_at";

/// Insert a new alert.
pub async fn create_alert(pool: &SqlitePool, alert: &Alert) -> Result<()> {
    let contacted = serde_json::to_string(&alert.contacted)?;

    sqlx::query(
        r#"
        INSERT INTO sos_alerts (id, user_id, trigger_type, latitude, longitude, address,
                                status, sos_message, contacted_numbers, triggered_at,
                                sent_at, resolved_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&alert.id)
    .bind(&alert.user_id)
    .bind(&alert.trigger_type)
    .bind(alert.latitude)
    .bind(alert.longitude)
    .bind(&alert.address)
    .bind(alert.status.as_str())
    .bind(&alert.sos_message)
    .bind(contacted)
    .bind(alert.triggered_at)
    .bind(alert.sent_at)
    .bind(alert.resolved_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Alert",
                    id: alert.id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(())
}

/// Get an alert by ID.
pub async fn get_alert(pool: &SqlitePool, id: &str) -> Result<Alert> {
    let row = sqlx::query_as::<_, AlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} FROM sos_alerts WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Alert",
        id: id.to_string(),
    })?;

    Alert::try_from(row)
}

/// Find the newest alert of a user that is still in countdown.
pub async fn find_countdown_alert(pool: &SqlitePool, user_id: &str) -> Result<Option<Alert>> {
    let row = sqlx::query_as::<_, AlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} FROM sos_alerts \
         WHERE user_id = ? AND status = 'countdown' \
         ORDER BY triggered_at DESC, rowid DESC LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(Alert::try_from).transpose()
}

/// Move an alert from `countdown` to `sent`.
///
/// Returns `false` when the alert is not in countdown (unknown, already sent or
/// closed); only one caller can win the transition.
pub async fn claim_for_dispatch(
    pool: &SqlitePool,
    id: &str,
    sent_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sos_alerts
        SET status = 'sent', sent_at = ?
        WHERE id = ? AND status = 'countdown'
        "#,
    )
    .bind(sent_at)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record the destinations attempted by the dispatch pass.
///
/// The list is written only while it is still empty.
pub async fn record_contacted(pool: &SqlitePool, id: &str, contacted: &[String]) -> Result<()> {
    let encoded = serde_json::to_string(contacted)?;

    let result = sqlx::query(
        r#"
        UPDATE sos_alerts
        SET contacted_numbers = ?
        WHERE id = ? AND contacted_numbers = '[]'
        "#,
    )
    .bind(encoded)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(alert_id = %id, "Contacted list already recorded or alert missing");
    }

    Ok(())
}

/// Close an alert as `cancelled` or `resolved`.
///
/// Only open alerts (`countdown` or `sent`) are closed. Returns `false` when
/// the alert was already closed, so `resolved_at` is written at most once.
pub async fn close_alert(
    pool: &SqlitePool,
    id: &str,
    status: AlertStatus,
    resolved_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sos_alerts
        SET status = ?, resolved_at = ?
        WHERE id = ? AND status IN ('countdown', 'sent')
        "#,
    )
    .bind(status.as_str())
    .bind(resolved_at)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(true);
    }

    let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM sos_alerts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match exists {
        Some(_) => Ok(false),
        None => Err(DatabaseError::NotFound {
            entity: "Alert",
            id: id.to_string(),
        }),
    }
}

/// List a user's alerts, newest first.
pub async fn list_user_alerts(pool: &SqlitePool, user_id: &str) -> Result<Vec<Alert>> {
    let rows = sqlx::query_as::<_, AlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} FROM sos_alerts \
         WHERE user_id = ? \
         ORDER BY triggered_at DESC, rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Alert::try_from).collect()
}

/// Count a user's alerts in a given state.
pub async fn count_user_alerts_with_status(
    pool: &SqlitePool,
    user_id: &str,
    status: AlertStatus,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM sos_alerts
        WHERE user_id = ? AND status = ?
        "#,
    )
    .bind(user_id)
    .bind(status.as_str())
    .fetch_one(pool)
    .await?;

    Ok(count)
}
