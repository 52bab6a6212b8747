//! `expenseshare-desktop`
//!
//! **Responsibility:** the application layer the desktop GUI talks to.
//!
//! This crate provides:
//! - [`ExpenseShare`], the service facade over accounts, groups and balances
//! - environment-driven [`AppConfig`]
//! - CSV export of a user's expense history

pub mod config;
pub mod errors;
pub mod export;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use errors::{ServiceError, ServiceResult};
pub use service::ExpenseShare;
pub use types::{Dashboard, ExpenseEntry, NewExpense, SplitRequest};
