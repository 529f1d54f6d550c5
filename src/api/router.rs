//! HTTP API router.
//!
//! `/` and `/api/health`, `/api/auth/register`, `/api/auth/login` are
//! public; everything else under `/api/` requires a bearer token.
//!
//! Middleware stack (outermost → innermost):
//! Extension(ApiContext) → Auth validator → Audit logger → Handler

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::MAX_UPLOAD_BYTES;

/// Build the full application router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn build_router(ctx: ApiContext) -> Router {
    // Protected routes: require auth
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/diagnosis", post(endpoints::diagnosis::basic))
        .route("/diagnosis/advanced", post(endpoints::diagnosis::advanced))
        .route("/conditions/search", post(endpoints::conditions::search))
        .route(
            "/reports",
            post(endpoints::reports::upload).get(endpoints::reports::list),
        )
        .route("/dashboard", get(endpoints::dashboard::list))
        .with_state(ctx.clone())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    Router::new()
        .route("/", get(endpoints::home::index))
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(TraceLayer::new_for_http())
}
