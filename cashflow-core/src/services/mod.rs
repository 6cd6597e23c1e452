//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions.

mod balance;
mod scheduler;

pub use balance::{BalanceService, PaginatedBalances};
pub use scheduler::SchedulerService;
