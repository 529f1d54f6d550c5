//! Account endpoints: register, login, logout.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::auth::bearer_token;
use crate::api::types::{ApiContext, UserContext};
use crate::auth::{self, SessionInfo};

#[derive(Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub username: String,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_in: u64,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

/// `POST /api/auth/register`: create an account.
///
/// PBKDF2 is CPU-bound, so hashing runs on the blocking pool.
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let store = ctx.store.clone();
    let iterations = ctx.password_iterations;
    let user = tokio::task::spawn_blocking(move || {
        auth::register(store.as_ref(), &req.username, &req.password, iterations)
    })
    .await??;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            message: "Registration successful! Please login.",
        }),
    ))
}

/// `POST /api/auth/login`: verify credentials and issue a bearer token.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let store = ctx.store.clone();
    let user = tokio::task::spawn_blocking(move || {
        auth::authenticate(store.as_ref(), &req.username, &req.password)
    })
    .await??;

    let (token, ttl) = {
        let mut sessions = ctx
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        let token = sessions.issue(SessionInfo {
            user_id: user.id,
            username: user.username.clone(),
        });
        (token, sessions.ttl())
    };

    tracing::info!(username = %user.username, "Login successful");
    Ok(Json(LoginResponse {
        token,
        username: user.username,
        expires_in: ttl.as_secs(),
    }))
}

/// `POST /api/auth/logout`: revoke the presented token.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    ctx.sessions
        .lock()
        .map_err(|_| ApiError::Internal("session lock".into()))?
        .revoke(token);

    tracing::info!(username = %user.username, "Logged out");
    Ok(Json(LogoutResponse {
        message: "You have been logged out",
    }))
}
