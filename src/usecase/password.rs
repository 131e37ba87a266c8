//! Argon2id password hashing. The async entry points run on the blocking pool.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, password_hash::rand_core::OsRng};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hash(password_hash::Error),
    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(password_hash::Error),
    #[error("Password worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Hashes with a fresh salt; the result is a PHC string.
pub fn digest(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(PasswordError::Hash)
}

/// `Ok(false)` on a wrong password, `Err` only when `stored` cannot be read.
pub fn check(candidate: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(PasswordError::MalformedHash)?;

    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::MalformedHash(e)),
    }
}

pub async fn hash(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || digest(&password)).await?
}

pub async fn verify(candidate: String, stored: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || check(&candidate, &stored)).await?
}
