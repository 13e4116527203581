use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{error, warn};

use crate::shared::AppError;

/// Hashes a password into an argon2 PHC string on the blocking pool
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| {
            error!(error = %e, "Password hashing task failed");
            AppError::Internal
        })?
}

/// Checks a password against a stored hash on the blocking pool
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    tokio::task::spawn_blocking(move || verify_blocking(&password, &password_hash))
        .await
        .map_err(|e| {
            error!(error = %e, "Password verification task failed");
            AppError::Internal
        })?
}

fn hash_blocking(password: &str) -> Result<String, AppError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| {
        warn!(error = %e, "Failed to encode password salt");
        AppError::Internal
    })?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            warn!(error = %e, "Failed to hash password");
            AppError::Internal
        })
}

fn verify_blocking(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| {
        warn!(error = %e, "Stored password hash is malformed");
        AppError::Internal
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
