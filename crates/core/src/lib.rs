//! `tally-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod amount;
pub mod entity;
pub mod error;
pub mod id;
pub mod version;

pub use amount::{Amount, Currency};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AccountId, ActivityId, AdjustmentId, AllocationId, BusinessId, CardId, HoldId, JournalEntryId,
    LedgerAccountId, MessageGroupId, NetworkMessageId, PostingId, TransactionLimitId,
};
pub use version::ExpectedVersion;
