//! Event and command abstractions shared by the ledger and the dispatcher.

pub mod command;
pub mod event;

pub use command::Command;
pub use event::Event;
