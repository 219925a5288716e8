//! Hardware device routes.
//!
//! `/api/device/alert` is called by the bracelet itself and carries no user
//! identity; the device MAC is the only credential, so it is a weaker trust
//! tier than the gateway-authenticated routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use database::ConnectedDevice;
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{ApiJson, ApiResponse, Result};
use crate::routes::sos::{trigger_response, TriggerResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub device_name: String,
    pub device_mac: String,
    #[serde(default)]
    pub firmware_version: Option<String>,
}

#[derive(Deserialize)]
pub struct DeviceStatusRequest {
    pub is_connected: bool,
}

#[derive(Deserialize)]
pub struct DeviceAlertRequest {
    pub device_mac: String,
}

/// Pair a device with the caller.
pub async fn register(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, ApiResponse<ConnectedDevice>)> {
    let paired = state
        .engine
        .register_device(
            &user_id,
            &req.device_name,
            &req.device_mac,
            req.firmware_version.as_deref(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(paired).with_message("Device registered"),
    ))
}

/// The caller's most recently seen device.
pub async fn status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<ConnectedDevice>> {
    let device = state.engine.device_status(&user_id).await?;
    Ok(ApiResponse::ok(device))
}

/// Report one of the caller's devices as connected or disconnected.
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(device_id): Path<String>,
    ApiJson(req): ApiJson<DeviceStatusRequest>,
) -> Result<ApiResponse<ConnectedDevice>> {
    let device = state
        .engine
        .set_device_connected(&user_id, &device_id, req.is_connected)
        .await?;
    Ok(ApiResponse::ok(device))
}

pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(device_id): Path<String>,
) -> Result<ApiResponse<()>> {
    state.engine.remove_device(&user_id, &device_id).await?;
    Ok(ApiResponse::ok(()).with_message("Device removed"))
}

/// Device trigger.
pub async fn alert(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<DeviceAlertRequest>,
) -> Result<(StatusCode, ApiResponse<TriggerResponse>)> {
    info!("Device alert received");
    let outcome = state.engine.device_trigger(&req.device_mac).await?;
    trigger_response(outcome)
}
