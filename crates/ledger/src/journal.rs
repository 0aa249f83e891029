use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{
    Amount, Currency, DomainError, DomainResult, Entity, JournalEntryId, LedgerAccountId,
    PostingId,
};

/// One signed amount against one ledger account within a journal entry.
///
/// Owned exclusively by its journal entry; written once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub id: PostingId,
    pub journal_entry_id: JournalEntryId,
    pub ledger_account_id: LedgerAccountId,
    pub amount: Amount,
    pub effective_date: DateTime<Utc>,
    pub version: u64,
}

/// An atomic, zero-sum group of postings.
///
/// A reversal is a *new* entry with negated postings referencing the
/// original through `reversal_of`; the original is never mutated beyond
/// receiving the `reversed_by` back-link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub reversal_of: Option<JournalEntryId>,
    pub reversed_by: Option<JournalEntryId>,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl JournalEntry {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            id: JournalEntryId::new(),
            reversal_of: None,
            reversed_by: None,
            created_at,
            version: 0,
        }
    }
}

impl Entity for JournalEntry {
    type Id = JournalEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// One line of a journal-entry spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingSpec {
    pub ledger_account_id: LedgerAccountId,
    pub amount: Amount,
}

/// The input to `post`: the postings that must balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntrySpec {
    pub postings: Vec<PostingSpec>,
}

impl JournalEntrySpec {
    pub fn new(postings: Vec<PostingSpec>) -> Self {
        Self { postings }
    }

    /// A two-sided entry moving `amount` onto `to` and off `from`.
    pub fn transfer(from: LedgerAccountId, to: LedgerAccountId, amount: Amount) -> Self {
        Self::new(vec![
            PostingSpec {
                ledger_account_id: from,
                amount: amount.negate(),
            },
            PostingSpec {
                ledger_account_id: to,
                amount,
            },
        ])
    }

    /// Validate the core invariants and return the entry's single currency.
    ///
    /// - at least two postings
    /// - a ledger account appears at most once
    /// - one currency across all postings
    /// - amounts sum to exactly zero (accumulated in i128)
    ///
    /// Violations indicate a defect in the caller, never a business outcome,
    /// and must abort the enclosing transaction.
    pub fn validate(&self) -> DomainResult<Currency> {
        if self.postings.len() < 2 {
            return Err(DomainError::validation(
                "journal entry must have at least two postings",
            ));
        }

        let currency = self.postings[0].amount.currency();
        let mut sum: i128 = 0;
        for (idx, posting) in self.postings.iter().enumerate() {
            if posting.amount.currency() != currency {
                return Err(DomainError::CurrencyMismatch {
                    expected: currency,
                    found: posting.amount.currency(),
                });
            }
            if self.postings[..idx]
                .iter()
                .any(|p| p.ledger_account_id == posting.ledger_account_id)
            {
                return Err(DomainError::validation(
                    "ledger accounts must be unique within a journal entry",
                ));
            }
            sum += i128::from(posting.amount.units());
        }

        if sum != 0 {
            return Err(DomainError::UnbalancedEntry { sum: sum as i64 });
        }

        Ok(currency)
    }

    /// Build the spec that undoes `postings`: same accounts, negated amounts.
    pub fn reversal_of(postings: &[Posting]) -> Self {
        Self::new(
            postings
                .iter()
                .map(|p| PostingSpec {
                    ledger_account_id: p.ledger_account_id,
                    amount: p.amount.negate(),
                })
                .collect(),
        )
    }
}
