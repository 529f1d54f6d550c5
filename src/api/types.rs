//! Shared types for the HTTP API layer.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::auth::SessionStore;
use crate::config::AppConfig;
use crate::db::RecordStore;
use crate::pipeline::diagnosis::DiagnosisService;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn RecordStore>,
    pub diagnosis: Arc<DiagnosisService>,
    pub sessions: Arc<Mutex<SessionStore>>,
    pub upload_dir: PathBuf,
    pub password_iterations: u32,
}

impl ApiContext {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn RecordStore>,
        diagnosis: Arc<DiagnosisService>,
    ) -> Self {
        Self {
            store,
            diagnosis,
            sessions: Arc::new(Mutex::new(SessionStore::new(config.session_ttl))),
            upload_dir: config.upload_dir.clone(),
            password_iterations: config.password_iterations,
        }
    }
}

/// Authenticated user, injected into request extensions by the auth
/// middleware after successful token validation.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub username: String,
}
