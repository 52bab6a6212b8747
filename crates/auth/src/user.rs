//! User accounts.
//!
//! A person registers once with a unique username; the same account id is
//! their member id in every group they join.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use expenseshare_core::{Currency, DomainError, DomainResult, Entity, UserId};

use crate::password::{PasswordError, hash_password, verify_password};
use crate::session::Session;

/// Longest accepted username, in characters.
pub const MAX_USERNAME_LEN: usize = 32;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 4;

/// Account-level error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Password(#[from] PasswordError),
}

/// Trim `raw` and check the username rules.
pub fn normalize_username(raw: &str) -> DomainResult<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DomainError::invalid_input("username cannot be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(DomainError::invalid_input(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(username.to_string())
}

pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::invalid_input(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// A registered user with a hashed password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    id: UserId,
    username: String,
    email: Option<String>,
    currency: Currency,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Validate the registration form and hash the password.
    ///
    /// Username uniqueness is the account store's job.
    pub fn register(
        username: &str,
        password: &str,
        email: Option<&str>,
        currency: Currency,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AccountError> {
        let username = normalize_username(username)?;
        validate_password(password)?;
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase);

        Ok(Self {
            id: UserId::new(),
            username,
            email,
            currency,
            password_hash: hash_password(password)?,
            created_at,
        })
    }

    /// Rebuild an account loaded from storage.
    pub fn from_parts(
        id: UserId,
        username: String,
        email: Option<String>,
        currency: Currency,
        password_hash: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            email,
            currency,
            password_hash,
            created_at,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Check the password and open a session.
    ///
    /// A wrong password is `Unauthorized`, same as an unknown user.
    pub fn authenticate(&self, password: &str) -> Result<Session, AccountError> {
        match verify_password(&self.password_hash, password) {
            Ok(()) => Ok(Session::for_account(self)),
            Err(PasswordError::Mismatch) => Err(DomainError::Unauthorized.into()),
            Err(other) => Err(other.into()),
        }
    }
}

impl Entity for UserAccount {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
