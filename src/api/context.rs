//! Per-request authentication context
//!
//! Handlers take a [`RequestContext`] instead of reading a global current
//! user. A request without an `Authorization` header is anonymous; a header
//! that is present but invalid rejects the request with 401, on any route.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::AppState;
use crate::db::UserRecord;
use crate::error::ApiError;

const MALFORMED_HEADER: &str = "Authorization header must be of the form: Bearer <token>.";

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user: Option<UserRecord>,
    token: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The signed-in user, or 401 for an anonymous request
    pub fn require_user(&self) -> Result<&UserRecord, ApiError> {
        self.user.as_ref().ok_or_else(ApiError::missing_credentials)
    }

    /// The signed-in user together with the token they presented
    pub fn require_session(&self) -> Result<(&UserRecord, &str), ApiError> {
        match (&self.user, &self.token) {
            (Some(user), Some(token)) => Ok((user, token)),
            _ => Err(ApiError::missing_credentials()),
        }
    }
}

/// Extract the token from `Bearer <token>`; the scheme is case-insensitive
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty() && !token.contains(' ')).then_some(token)
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self::anonymous());
        };

        let token = header
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::Unauthorized(MALFORMED_HEADER.to_string()))?;

        let user = state
            .auth
            .authenticate(token)
            .await
            .map_err(|e| e.into_api("Authentication failed"))?;

        tracing::debug!(user_id = %user.id, "Authenticated request");

        Ok(Self {
            user: Some(user),
            token: Some(token.to_string()),
        })
    }
}
