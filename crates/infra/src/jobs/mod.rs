//! Background jobs.

pub mod hold_expiry;

pub use hold_expiry::{SweeperConfig, SweeperHandle, SweeperStats, spawn_hold_expiry_sweeper};
