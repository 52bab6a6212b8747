//! `expenseshare-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, money, the domain error model and the aggregate traits the
//! ledger builds on.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ExpenseId, GroupId, SettlementId, UserId};
pub use money::{Currency, Money};
pub use value_object::ValueObject;
