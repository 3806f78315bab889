//! Password hashing and session tokens.
//! Sessions are explicit server-side state: opaque random tokens handed to
//! the client and resolved per request. No ambient token state anywhere.

use chrono::Duration;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Access tokens live for an hour; refresh tokens for a week.
pub fn access_token_ttl() -> Duration {
    Duration::hours(1)
}

pub fn refresh_token_ttl() -> Duration {
    Duration::days(7)
}

/// Random 256-bit hex token for sessions.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Salted SHA-256, stored as `salt$hexdigest`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = hex::encode(salt);
    format!("{}${}", salt, digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    digest(salt, password) == expected
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
