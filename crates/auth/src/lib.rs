//! `expenseshare-auth`: user accounts, password hashing and sessions.
//!
//! Storage-agnostic: account stores in `expenseshare-infra` persist
//! [`UserAccount`] values, this crate only decides what a valid account is.

pub mod password;
pub mod session;
pub mod user;

pub use password::{PasswordError, hash_password, verify_password};
pub use session::Session;
pub use user::{
    AccountError, MAX_USERNAME_LEN, MIN_PASSWORD_LEN, UserAccount, normalize_username,
    validate_password,
};
