//! `tally-activity` — the customer-visible activity projection.
//!
//! A denormalized, append-mostly view of every balance-affecting (or
//! declined) event. Derived from holds, adjustments and declines; never the
//! source of truth for balances and never recomputed from scratch.

pub mod activity;
pub mod filter;

pub use activity::{
    AccountActivity, ActivityDetails, ActivityStatus, ActivityType, CardDetails, PaymentDetails,
};
pub use filter::{ActivityFilter, Page, PageRequest};
