//! Caller identity.
//!
//! Tokens are validated by the gateway in front of this service, which
//! forwards the user id in [`USER_ID_HEADER`]. Handlers never see a request
//! without it.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Err(ApiError::Unauthorized);
        };

        let Ok(value) = value.to_str() else {
            return Err(ApiError::Unauthorized);
        };

        let user_id = value.trim();
        if user_id.is_empty() {
            return Err(ApiError::Unauthorized);
        }

        Ok(AuthUser(user_id.to_string()))
    }
}
