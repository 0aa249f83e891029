//! Infrastructure layer: transactional store, orchestrating services, jobs.

pub mod jobs;
pub mod platform;
pub mod services;
pub mod store;

pub use platform::{AccountBalances, AllocationVisibility, PermitAll, Platform};
pub use store::{InMemoryStore, Txn};

#[cfg(test)]
mod integration_tests;
