//! `tally-ledger` — the double-entry core.
//!
//! A journal entry groups the postings that must net to zero; a posting is
//! one signed amount against one ledger account. Validation lives here as
//! pure functions; persistence and balance caching are infrastructure
//! concerns.

pub mod account;
pub mod journal;

pub use account::{LedgerAccount, LedgerAccountType};
pub use journal::{JournalEntry, JournalEntrySpec, Posting, PostingSpec};
