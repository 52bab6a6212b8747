//! Argon2 password hashing (PHC string format).

use argon2::{
    Argon2,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    /// The candidate password does not match the stored hash.
    #[error("password does not match")]
    Mismatch,

    /// The stored hash is not a valid PHC string.
    #[error("stored password hash is malformed: {0}")]
    Malformed(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Check `candidate` against a PHC string produced by [`hash_password`].
pub fn verify_password(stored_hash: &str, candidate: &str) -> Result<(), PasswordError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| PasswordError::Malformed(e.to_string()))?;
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .map_err(|err| match err {
            PasswordHashError::Password => PasswordError::Mismatch,
            other => PasswordError::Hashing(other.to_string()),
        })
}
