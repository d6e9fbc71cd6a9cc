//! Password hashing with Argon2.
//!
//! Hashing is deliberately expensive, so the async wrappers run it on the
//! blocking pool instead of a runtime worker.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

use crate::error::AppError;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("hash error: {0}")]
    Hash(String),
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        AppError::Internal(e.to_string())
    }
}

/// Argon2id with a fresh random salt; returns a PHC string.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// `true` when `password` matches `hash`. A malformed stored hash is an error,
/// not a mismatch.
pub fn verify(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub async fn hash_blocking(password: String) -> Result<String, AppError> {
    Ok(tokio::task::spawn_blocking(move || hash(&password)).await??)
}

pub async fn verify_blocking(password: String, hash: String) -> Result<bool, AppError> {
    Ok(tokio::task::spawn_blocking(move || verify(&password, &hash)).await??)
}
