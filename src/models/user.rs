use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp;

/// A login account as stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Plaintext password carried by old seeded accounts. Read so such
    /// accounts can be detected and refused; never written.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserAccount {
    pub fn new(username: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: Some(password_hash),
            password: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    pub fn has_legacy_plaintext(&self) -> bool {
        self.password_hash.is_none() && self.password.is_some()
    }
}
