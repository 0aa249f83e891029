//! Domain error model.

use thiserror::Error;

use crate::amount::Currency;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
///
/// Policy rejections (limit violations, spend controls) are *not* errors:
/// they are ordinary decline outcomes and travel as data, never through this
/// enum.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, wrong sign).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested record was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A concurrent writer won; the caller must re-read and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Journal-entry postings do not sum to zero. Indicates a defect, never
    /// a business outcome.
    #[error("journal entry postings sum to {sum}, expected zero")]
    UnbalancedEntry { sum: i64 },

    /// Postings (or operands) mixed currencies.
    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    /// A journal entry can be reversed at most once.
    #[error("journal entry {entry} already reversed")]
    AlreadyReversed { entry: String },

    /// The operation would drive available balance below zero.
    #[error("insufficient funds on account {account}: requested {requested}")]
    InsufficientFunds { account: String, requested: String },

    /// A lifecycle transition not permitted by the state machine.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn already_reversed(entry: impl core::fmt::Display) -> Self {
        Self::AlreadyReversed {
            entry: entry.to_string(),
        }
    }

    pub fn insufficient_funds(
        account: impl core::fmt::Display,
        requested: impl core::fmt::Display,
    ) -> Self {
        Self::InsufficientFunds {
            account: account.to_string(),
            requested: requested.to_string(),
        }
    }

    pub fn invalid_transition(
        from: impl core::fmt::Display,
        to: impl core::fmt::Display,
    ) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
