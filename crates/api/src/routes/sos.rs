//! SOS routes.

use alert_engine::{EngineError, TriggerOutcome, TriggerReason};
use axum::extract::State;
use axum::http::StatusCode;
use database::Alert;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiResponse, Result};
use crate::state::AppState;

/// Request to trigger an alert.
#[derive(Deserialize)]
pub struct TriggerRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub trigger_type: Option<String>,
}

/// Request naming an existing alert.
#[derive(Deserialize)]
pub struct AlertRequest {
    pub alert_id: String,
}

/// Alert returned by a trigger, with the reason it was returned.
#[derive(Serialize)]
pub struct TriggerResponse {
    #[serde(flatten)]
    pub alert: Alert,
    pub reason: TriggerReason,
}

/// Result of a dispatch-now call.
#[derive(Serialize)]
pub struct SendResponse {
    #[serde(flatten)]
    pub alert: Alert,
    pub attempted: usize,
    pub failed: usize,
}

/// Turn a trigger outcome into a response; 201 only for a new alert.
pub(crate) fn trigger_response(
    outcome: TriggerOutcome,
) -> Result<(StatusCode, ApiResponse<TriggerResponse>)> {
    let reason = outcome.reason;
    let Some(alert) = outcome.alert else {
        return Err(ApiError::OnCooldown(reason.message().to_string()));
    };

    let status = if reason == TriggerReason::Triggered {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        ApiResponse::ok(TriggerResponse { alert, reason }).with_message(reason.message()),
    ))
}

/// Manual trigger.
pub async fn trigger(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<TriggerRequest>,
) -> Result<(StatusCode, ApiResponse<TriggerResponse>)> {
    info!(user_id = %user_id, "Manual SOS trigger");
    let outcome = state
        .engine
        .manual_trigger(&user_id, req.latitude, req.longitude, req.trigger_type.as_deref())
        .await?;
    trigger_response(outcome)
}

/// Dispatch an alert still in countdown.
pub async fn send_now(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<AlertRequest>,
) -> Result<ApiResponse<SendResponse>> {
    owned_alert(&state, &user_id, &req.alert_id).await?;

    let report = state.engine.dispatch(&req.alert_id).await?;
    let alert = state.engine.get_alert(&req.alert_id).await?;

    Ok(ApiResponse::ok(SendResponse {
        alert,
        attempted: report.attempted,
        failed: report.failed,
    })
    .with_message("SOS sent"))
}

/// Close an alert as cancelled.
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<AlertRequest>,
) -> Result<ApiResponse<Alert>> {
    owned_alert(&state, &user_id, &req.alert_id).await?;
    let alert = state.engine.cancel(&req.alert_id).await?;
    Ok(ApiResponse::ok(alert).with_message("SOS cancelled"))
}

/// Close an alert as resolved.
pub async fn resolve(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<AlertRequest>,
) -> Result<ApiResponse<Alert>> {
    owned_alert(&state, &user_id, &req.alert_id).await?;
    let alert = state.engine.resolve(&req.alert_id).await?;
    Ok(ApiResponse::ok(alert).with_message("SOS resolved"))
}

/// The caller's alerts, newest first.
pub async fn history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<Vec<Alert>>> {
    let alerts = state.engine.history(&user_id).await?;
    Ok(ApiResponse::ok(alerts))
}

/// Load an alert, hiding alerts of other users behind `NOT_FOUND`.
async fn owned_alert(state: &AppState, user_id: &str, alert_id: &str) -> Result<Alert> {
    let alert = state.engine.get_alert(alert_id).await?;
    if alert.user_id != user_id {
        return Err(EngineError::NotFound {
            entity: "Alert",
            id: alert_id.to_string(),
        }
        .into());
    }
    Ok(alert)
}
