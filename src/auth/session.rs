//! In-memory bearer sessions. Only SHA-256 hashes of tokens are kept.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Who a valid token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub username: String,
}

struct SessionEntry {
    info: SessionInfo,
    expires: Instant,
}

pub struct SessionStore {
    sessions: HashMap<[u8; 32], SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `info`. The plaintext token is returned once and
    /// never stored.
    pub fn issue(&mut self, info: SessionInfo) -> String {
        // Periodic cleanup when the map grows large
        if self.sessions.len() > 1000 {
            self.purge_expired();
        }

        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            SessionEntry {
                info,
                expires: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// Look up a token. Expired entries are dropped on access.
    pub fn validate(&mut self, token: &str) -> Option<SessionInfo> {
        let hash = hash_token(token);
        match self.sessions.get(&hash) {
            Some(entry) if Instant::now() < entry.expires => Some(entry.info.clone()),
            Some(_) => {
                self.sessions.remove(&hash);
                None
            }
            None => None,
        }
    }

    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    pub fn purge_expired(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, entry| now < entry.expires);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> SessionInfo {
        SessionInfo {
            user_id: Uuid::new_v4(),
            username: "alice".into(),
        }
    }

    #[test]
    fn generate_token_is_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn hash_token_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn issue_validate_revoke() {
        let mut store = SessionStore::new(Duration::from_secs(60));
        let user = info();
        let token = store.issue(user.clone());
        assert_eq!(store.validate(&token), Some(user));
        assert!(store.validate("not-a-token").is_none());
        assert!(store.revoke(&token));
        assert!(store.validate(&token).is_none());
        assert!(!store.revoke(&token));
    }

    #[test]
    fn expired_token_is_rejected_and_dropped() {
        let mut store = SessionStore::new(Duration::ZERO);
        let token = store.issue(info());
        assert!(store.validate(&token).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn purge_removes_only_expired() {
        let mut store = SessionStore::new(Duration::ZERO);
        store.issue(info());
        store.ttl = Duration::from_secs(60);
        let live = store.issue(info());
        store.purge_expired();
        assert_eq!(store.len(), 1);
        assert!(store.validate(&live).is_some());
    }
}
