//! Account endpoints: register, login, logout, profile, password change

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};

use super::context::RequestContext;
use super::validation::{
    login_fields, parse_object, password_change_fields, profile_fields, register_fields,
};
use crate::AppState;
use crate::db::UserRecord;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub date_joined: String,
    pub last_login: Option<String>,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            date_joined: user.created_at.clone(),
            last_login: user.last_login_at.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    token_type: &'static str,
    expires_in: i64,
    user: UserResponse,
}

/// `POST /api/auth/register/`
async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    const FAILURE: &str = "Registration failed";
    let data = parse_object(&body, FAILURE)?;
    let input = register_fields(&data).map_err(|errors| ApiError::validation(FAILURE, errors))?;

    let result = state
        .auth
        .register(input)
        .await
        .map_err(|e| e.into_api(FAILURE))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": UserResponse::from(&result.user),
            "token": result.token.token,
        })),
    ))
}

/// `POST /api/auth/login/`: `username` may also be an email address
async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LoginResponse>, ApiError> {
    const FAILURE: &str = "Login failed";
    let data = parse_object(&body, FAILURE)?;
    let (username, password) =
        login_fields(&data).map_err(|errors| ApiError::validation(FAILURE, errors))?;

    let result = state
        .auth
        .login(&username, &password)
        .await
        .map_err(|e| e.into_api(FAILURE))?;

    tracing::info!(user_id = %result.user.id, "User logged in");

    Ok(Json(LoginResponse {
        token: result.token.token,
        token_type: "Bearer",
        expires_in: result.token.expires_in,
        user: UserResponse::from(&result.user),
    }))
}

/// `POST /api/auth/logout/`
async fn logout(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<Value>, ApiError> {
    let (_, token) = ctx.require_session()?;
    state
        .auth
        .logout(token)
        .await
        .map_err(|e| e.into_api("Logout failed"))?;

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

/// `GET /api/auth/profile/`
async fn get_profile(ctx: RequestContext) -> Result<Json<UserResponse>, ApiError> {
    let user = ctx.require_user()?;
    Ok(Json(UserResponse::from(user)))
}

/// `PATCH /api/auth/profile/`
async fn update_profile(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    const FAILURE: &str = "Failed to update profile";
    let user = ctx.require_user()?;
    let data = parse_object(&body, FAILURE)?;
    let update = profile_fields(&data).map_err(|errors| ApiError::validation(FAILURE, errors))?;

    let updated = state
        .auth
        .update_profile(user, update)
        .await
        .map_err(|e| e.into_api(FAILURE))?;

    Ok(Json(json!({
        "message": "Your account has been updated!",
        "user": UserResponse::from(&updated),
    })))
}

/// `POST /api/auth/password/`: the token used for the request stops working
async fn change_password(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    const FAILURE: &str = "Failed to change password";
    let (user, token) = ctx.require_session()?;
    let data = parse_object(&body, FAILURE)?;
    let (current, new) =
        password_change_fields(&data).map_err(|errors| ApiError::validation(FAILURE, errors))?;

    state
        .auth
        .change_password(user, token, &current, &new)
        .await
        .map_err(|e| e.into_api(FAILURE))?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(json!({
        "message": "Password changed successfully. Please log in again.",
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register/", post(register))
        .route("/auth/login/", post(login))
        .route("/auth/logout/", post(logout))
        .route("/auth/profile/", get(get_profile).patch(update_profile))
        .route("/auth/password/", post(change_password))
}
