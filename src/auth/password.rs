//! Salted PBKDF2-HMAC-SHA256 password hashes.
//!
//! Stored form: `pbkdf2:sha256:<iterations>$<salt b64>$<hash b64>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::AuthError;

pub const HASH_PREFIX: &str = "pbkdf2:sha256:";
pub const SALT_LENGTH: usize = 16;
pub const KEY_LENGTH: usize = 32;

/// Generate a cryptographically random salt
fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let key = derive(password, &salt, iterations);
    format!(
        "{HASH_PREFIX}{iterations}${}${}",
        STANDARD.encode(salt),
        STANDARD.encode(key)
    )
}

/// Check `password` against a stored hash in constant time. The iteration
/// count comes from the stored hash, not from current configuration.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let rest = stored.strip_prefix(HASH_PREFIX).ok_or(AuthError::MalformedHash)?;
    let mut parts = rest.split('$');
    let (Some(iterations), Some(salt), Some(expected), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedHash);
    };

    let iterations: u32 = iterations.parse().map_err(|_| AuthError::MalformedHash)?;
    if iterations == 0 {
        return Err(AuthError::MalformedHash);
    }
    let salt = STANDARD.decode(salt).map_err(|_| AuthError::MalformedHash)?;
    let expected = STANDARD.decode(expected).map_err(|_| AuthError::MalformedHash)?;
    if expected.len() != KEY_LENGTH {
        return Err(AuthError::MalformedHash);
    }

    let actual = derive(password, &salt, iterations);
    Ok(actual.as_slice().ct_eq(expected.as_slice()).into())
}
