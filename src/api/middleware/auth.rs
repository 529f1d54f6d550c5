//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, validates it against the
//! session store and injects `UserContext` for downstream handlers.

use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};

/// Bearer token from the `Authorization` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Require a valid session token.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;

    let session = {
        let mut sessions = ctx
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        sessions.validate(token).ok_or(ApiError::Unauthorized)?
    }; // MutexGuard dropped here, before any .await

    req.extensions_mut().insert(UserContext {
        user_id: session.user_id,
        username: session.username,
    });

    let mut response = next.run(req).await;
    response.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        axum::http::HeaderValue::from_static("no-store"),
    );
    Ok(response)
}
