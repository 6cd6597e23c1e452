//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures -
//! no I/O or external dependencies.

pub mod balance;
pub mod result;
pub(crate) mod transaction;

pub use balance::{BalanceSummary, DailyBalance};
pub use transaction::{Transaction, TransactionKind};
