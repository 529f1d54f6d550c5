//! Service description at `/`.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HomeResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: &'static [&'static str],
}

const ENDPOINTS: &[&str] = &[
    "GET /api/health",
    "POST /api/auth/register",
    "POST /api/auth/login",
    "POST /api/auth/logout",
    "POST /api/diagnosis",
    "POST /api/diagnosis/advanced",
    "POST /api/conditions/search",
    "POST /api/reports",
    "GET /api/reports",
    "GET /api/dashboard?name=<patient>",
];

/// `GET /`: public landing response.
pub async fn index() -> Json<HomeResponse> {
    Json(HomeResponse {
        name: crate::config::APP_NAME,
        version: crate::config::APP_VERSION,
        description: "Vitals-based diagnosis with AI-assisted analysis and medical references. \
                      For educational purposes only.",
        endpoints: ENDPOINTS,
    })
}
