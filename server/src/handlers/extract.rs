//! Request extractors for caller identity and admin access.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::models::UserId;
use crate::state::AppState;
use crate::utils::error::AppError;

/// Header carrying the already-authenticated caller's opaque id.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// The authenticated caller. Rejects with 401 when the header is missing or
/// not a valid id.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::AuthError("Missing user identity".to_string()))?;

        raw.to_str()
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .map(CurrentUser)
            .ok_or_else(|| AppError::AuthError("Invalid user identity".to_string()))
    }
}

/// Proof that the request carried the configured admin token.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

#[async_trait]
impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Err(AppError::Forbidden(
                "Administrative actions are disabled".to_string(),
            ));
        };

        let supplied = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());

        match supplied {
            Some(token) if token == expected => Ok(AdminAccess),
            _ => Err(AppError::Forbidden("Invalid admin token".to_string())),
        }
    }
}
