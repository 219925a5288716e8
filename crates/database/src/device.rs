//! Connected device registry.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::ConnectedDevice;
use crate::validation::normalize_device_mac;
use crate::{DatabaseError, Result};

/// Register a device for a user.
///
/// Registering a MAC that is already known transfers it to `user_id`, marks it
/// connected and refreshes `last_seen`.
pub async fn register_device(
    pool: &SqlitePool,
    user_id: &str,
    device_name: &str,
    device_mac: &str,
    firmware_version: Option<&str>,
) -> Result<ConnectedDevice> {
    let mac = normalize_device_mac(device_mac)?;
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO connected_devices (id, user_id, device_name, device_mac, firmware_version,
                                       is_connected, last_seen, paired_at)
        VALUES (?, ?, ?, ?, ?, 1, ?, ?)
        ON CONFLICT(device_mac) DO UPDATE SET
            user_id = excluded.user_id,
            is_connected = 1,
            last_seen = excluded.last_seen
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(device_name)
    .bind(&mac)
    .bind(firmware_version)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_mac(pool, &mac)
        .await?
        .ok_or(DatabaseError::NotFound {
            entity: "Device",
            id: mac,
        })
}

/// Look up a device by its hardware identifier.
pub async fn find_by_mac(pool: &SqlitePool, device_mac: &str) -> Result<Option<ConnectedDevice>> {
    let mac = normalize_device_mac(device_mac)?;

    let device = sqlx::query_as::<_, ConnectedDevice>(
        r#"
        SELECT id, user_id, device_name, device_mac, firmware_version,
               is_connected, last_seen, paired_at
        FROM connected_devices
        WHERE device_mac = ?
        "#,
    )
    .bind(mac)
    .fetch_optional(pool)
    .await?;

    Ok(device)
}

/// Whether the user has at least one connected device.
pub async fn has_connected_device(pool: &SqlitePool, user_id: &str) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT 1
        FROM connected_devices
        WHERE user_id = ? AND is_connected = 1
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// The user's most recently seen device.
pub async fn latest_device(pool: &SqlitePool, user_id: &str) -> Result<Option<ConnectedDevice>> {
    let device = sqlx::query_as::<_, ConnectedDevice>(
        r#"
        SELECT id, user_id, device_name, device_mac, firmware_version,
               is_connected, last_seen, paired_at
        FROM connected_devices
        WHERE user_id = ?
        ORDER BY last_seen IS NULL, last_seen DESC, paired_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(device)
}

/// Mark one of the user's devices connected or disconnected.
///
/// Connecting refreshes `last_seen`. A device owned by someone else is
/// reported as not found.
pub async fn set_connected(
    pool: &SqlitePool,
    user_id: &str,
    device_id: &str,
    connected: bool,
) -> Result<ConnectedDevice> {
    let result = sqlx::query(
        r#"
        UPDATE connected_devices
        SET is_connected = ?,
            last_seen = CASE WHEN ? THEN ? ELSE last_seen END
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(connected)
    .bind(connected)
    .bind(Utc::now())
    .bind(device_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Device",
            id: device_id.to_string(),
        });
    }

    let device = sqlx::query_as::<_, ConnectedDevice>(
        r#"
        SELECT id, user_id, device_name, device_mac, firmware_version,
               is_connected, last_seen, paired_at
        FROM connected_devices
        WHERE id = ?
        "#,
    )
    .bind(device_id)
    .fetch_one(pool)
    .await?;

    Ok(device)
}

/// Unpair one of the user's devices.
pub async fn delete_device(pool: &SqlitePool, user_id: &str, device_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM connected_devices WHERE id = ? AND user_id = ?")
        .bind(device_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Device",
            id: device_id.to_string(),
        });
    }

    Ok(())
}
