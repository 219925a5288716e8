//! User device settings.

use axum::extract::State;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::{ApiJson, ApiResponse, Result};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct FcmTokenRequest {
    /// `null` or an empty string clears the token.
    pub fcm_token: Option<String>,
}

/// Register the push token that receives the "SOS Alert Sent" notice.
pub async fn update_fcm_token(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<FcmTokenRequest>,
) -> Result<ApiResponse<()>> {
    state
        .engine
        .set_push_token(&user_id, req.fcm_token.as_deref())
        .await?;
    Ok(ApiResponse::ok(()).with_message("FCM token updated"))
}
