//! Automatic protection routes.

use alert_engine::{ProtectionStatus, SensorAnalysis, SensorReading, SensorType, Sensitivity};
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{ApiJson, ApiResponse, Result};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub is_active: bool,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub is_active: bool,
}

/// A window of readings from one sensor.
#[derive(Deserialize)]
pub struct SensorDataRequest {
    pub sensor_type: SensorType,
    pub data: Vec<SensorReading>,
    /// `high`, `medium` or `low`; anything else means medium.
    #[serde(default)]
    pub sensitivity: Option<String>,
}

/// A user-labelled window for retraining.
#[derive(Deserialize)]
pub struct CollectRequest {
    pub sensor_type: SensorType,
    pub data: Vec<SensorReading>,
    /// 1 = danger, 0 = safe.
    pub label: i64,
}

#[derive(Serialize)]
pub struct CollectResponse {
    pub samples_saved: u64,
}

pub async fn toggle(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<ToggleRequest>,
) -> Result<ApiResponse<ToggleResponse>> {
    let is_active = state.engine.toggle_protection(&user_id, req.is_active);
    let message = if is_active {
        "Protection activated"
    } else {
        "Protection deactivated"
    };
    Ok(ApiResponse::ok(ToggleResponse { is_active }).with_message(message))
}

pub async fn status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<ProtectionStatus>> {
    let status = state.engine.protection_status(&user_id).await?;
    Ok(ApiResponse::ok(status))
}

/// Sensor auto-trigger.
pub async fn sensor_data(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<SensorDataRequest>,
) -> Result<ApiResponse<SensorAnalysis>> {
    let sensitivity = Sensitivity::from_label(req.sensitivity.as_deref());
    let analysis = state
        .engine
        .analyze_sensor_data(&user_id, req.sensor_type, &req.data, sensitivity)
        .await?;
    Ok(ApiResponse::ok(analysis))
}

pub async fn collect(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<CollectRequest>,
) -> Result<ApiResponse<CollectResponse>> {
    let samples_saved = state
        .engine
        .collect_training_data(&user_id, req.sensor_type, &req.data, req.label)
        .await?;
    Ok(ApiResponse::ok(CollectResponse { samples_saved }).with_message("Training data saved"))
}
