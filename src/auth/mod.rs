//! Accounts and sessions: registration, credential checks, bootstrap admin.

pub mod password;
pub mod session;

pub use password::{hash_password, verify_password};
pub use session::{generate_token, hash_token, SessionInfo, SessionStore};

use thiserror::Error;

use crate::db::{count_users, find_user_by_username, insert_user, DatabaseError, RecordStore};
use crate::models::UserAccount;

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 6;
pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Please provide both username and password")]
    MissingCredentials,

    #[error("Username must be at least 3 characters long")]
    UsernameTooShort,

    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,

    #[error("Username can only contain letters, numbers, and underscores")]
    UsernameInvalid,

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Malformed password hash")]
    MalformedHash,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

fn validate_registration(username: &str, password: &str) -> Result<(), AuthError> {
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    if username.chars().count() < MIN_USERNAME_CHARS {
        return Err(AuthError::UsernameTooShort);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::PasswordTooShort);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AuthError::UsernameInvalid);
    }
    Ok(())
}

/// Create an account. The username is trimmed; the password is not.
pub fn register(
    store: &dyn RecordStore,
    username: &str,
    password: &str,
    iterations: u32,
) -> Result<UserAccount, AuthError> {
    let username = username.trim();
    validate_registration(username, password)?;

    if find_user_by_username(store, username)?.is_some() {
        return Err(AuthError::UsernameTaken);
    }

    let user = UserAccount::new(username, hash_password(password, iterations));
    match insert_user(store, &user) {
        Ok(_) => {
            tracing::info!(username = %user.username, "User registered");
            Ok(user)
        }
        // Lost a race with a concurrent registration of the same name.
        Err(DatabaseError::ConstraintViolation(_)) => Err(AuthError::UsernameTaken),
        Err(e) => Err(e.into()),
    }
}

/// Check credentials. Accounts carrying only a legacy plaintext password
/// are refused.
pub fn authenticate(
    store: &dyn RecordStore,
    username: &str,
    password: &str,
) -> Result<UserAccount, AuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let user = find_user_by_username(store, username)?.ok_or(AuthError::InvalidCredentials)?;

    let Some(stored) = user.password_hash.as_deref() else {
        if user.has_legacy_plaintext() {
            tracing::warn!(username, "Login refused: account holds a plaintext password");
        }
        return Err(AuthError::InvalidCredentials);
    };

    match verify_password(password, stored) {
        Ok(true) => Ok(user),
        Ok(false) => Err(AuthError::InvalidCredentials),
        Err(e) => {
            tracing::error!(username, error = %e, "Stored password hash unreadable");
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Create the `admin` account when no users exist and a password is
/// configured. Returns whether an account was created.
pub fn bootstrap_admin(
    store: &dyn RecordStore,
    password: Option<&str>,
    iterations: u32,
) -> Result<bool, AuthError> {
    let Some(password) = password else {
        return Ok(false);
    };
    if count_users(store)? > 0 {
        return Ok(false);
    }
    register(store, BOOTSTRAP_ADMIN_USERNAME, password, iterations)?;
    tracing::info!("Bootstrap admin account created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, MemoryRecordStore};

    const ITER: u32 = 1_000;

    #[test]
    fn register_then_authenticate() {
        let store = MemoryRecordStore::new();
        let user = register(&store, "  alice_1 ", "secret1", ITER).unwrap();
        assert_eq!(user.username, "alice_1");

        let found = authenticate(&store, "alice_1", "secret1").unwrap();
        assert_eq!(found.id, user.id);
        assert!(matches!(
            authenticate(&store, "alice_1", "wrong!!"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&store, "nobody", "secret1"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn registration_rules() {
        let store = MemoryRecordStore::new();
        assert!(matches!(register(&store, "", "secret1", ITER), Err(AuthError::MissingCredentials)));
        assert!(matches!(register(&store, "ab", "secret1", ITER), Err(AuthError::UsernameTooShort)));
        assert!(matches!(register(&store, "abc", "12345", ITER), Err(AuthError::PasswordTooShort)));
        assert!(matches!(register(&store, "a-b-c", "secret1", ITER), Err(AuthError::UsernameInvalid)));
        assert!(matches!(register(&store, "ünï", "secret1", ITER), Err(AuthError::UsernameInvalid)));
        register(&store, "abc", "secret1", ITER).unwrap();
        assert!(matches!(register(&store, "abc", "other12", ITER), Err(AuthError::UsernameTaken)));
    }

    #[test]
    fn stored_record_has_no_plaintext() {
        let store = MemoryRecordStore::new();
        register(&store, "carol", "secret1", ITER).unwrap();
        let docs = store
            .find(Collection::Users, &crate::db::Filter::all(), None)
            .unwrap();
        assert!(docs[0].get("password").is_none());
        assert!(docs[0]["password_hash"]
            .as_str()
            .unwrap()
            .starts_with("pbkdf2:sha256:"));
    }

    #[test]
    fn legacy_plaintext_account_is_refused() {
        let store = MemoryRecordStore::new();
        store
            .insert(
                Collection::Users,
                &serde_json::json!({
                    "username": "admin",
                    "password": "admin123",
                    "created_at": "2024-01-01T00:00:00.000000Z"
                }),
            )
            .unwrap();
        assert!(matches!(
            authenticate(&store, "admin", "admin123"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn bootstrap_only_when_empty() {
        let store = MemoryRecordStore::new();
        assert!(!bootstrap_admin(&store, None, ITER).unwrap());
        assert!(bootstrap_admin(&store, Some("changeme"), ITER).unwrap());
        assert!(authenticate(&store, "admin", "changeme").is_ok());
        assert!(!bootstrap_admin(&store, Some("another1"), ITER).unwrap());
    }
}
