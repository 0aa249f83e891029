//! `tally-accounts` — balance views, holds, and adjustments.
//!
//! An account caches the settled ledger balance; the spendable figure is
//! derived at read time from the placed holds against it and is never
//! persisted.

pub mod account;
pub mod adjustment;
pub mod hold;

pub use account::{Account, AccountType};
pub use adjustment::{Adjustment, AdjustmentType};
pub use hold::{Hold, HoldStatus};
