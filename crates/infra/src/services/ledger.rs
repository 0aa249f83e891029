use chrono::{DateTime, Utc};
use tracing::debug;

use tally_core::{Currency, DomainError, DomainResult, JournalEntryId, PostingId};
use tally_ledger::{JournalEntry, JournalEntrySpec, LedgerAccount, LedgerAccountType, Posting};

use crate::store::Txn;

/// A persisted journal entry with its postings.
#[derive(Debug, Clone)]
pub struct PostedEntry {
    pub entry: JournalEntry,
    pub postings: Vec<Posting>,
}

impl PostedEntry {
    /// The posting against a specific ledger account.
    pub fn posting_for(&self, ledger_account_id: tally_core::LedgerAccountId) -> Option<&Posting> {
        self.postings
            .iter()
            .find(|p| p.ledger_account_id == ledger_account_id)
    }
}

/// The ledger engine: balanced journal entries, atomically, with the cached
/// account balances maintained in the same transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerService;

impl LedgerService {
    /// Create an owner-scoped ledger account (allocation/card provisioning).
    pub fn create_ledger_account(
        &self,
        txn: &mut Txn,
        account_type: LedgerAccountType,
        currency: Currency,
    ) -> DomainResult<LedgerAccount> {
        if !account_type.is_owner_scoped() {
            return Err(DomainError::validation(format!(
                "ledger account type {account_type} is a shared clearing account"
            )));
        }
        let account = LedgerAccount::new(account_type, currency);
        txn.insert_ledger_account(account.clone())?;
        Ok(account)
    }

    /// Shared clearing account for (type, currency), created on first use.
    pub fn get_or_create_clearing(
        &self,
        txn: &mut Txn,
        account_type: LedgerAccountType,
        currency: Currency,
    ) -> DomainResult<LedgerAccount> {
        if !account_type.is_clearing() {
            return Err(DomainError::validation(format!(
                "ledger account type {account_type} is owner-scoped"
            )));
        }
        if let Some(existing) = txn.find_clearing_account(account_type, currency) {
            return Ok(existing);
        }
        let account = LedgerAccount::new(account_type, currency);
        txn.insert_ledger_account(account.clone())?;
        Ok(account)
    }

    /// Post a balanced journal entry.
    ///
    /// Validates the spec, persists the entry and its postings, and applies
    /// each posting to the cached ledger balance of the affected account —
    /// all inside the caller's transaction. An invalid spec aborts with no
    /// partial effect.
    pub fn post(
        &self,
        txn: &mut Txn,
        spec: JournalEntrySpec,
        now: DateTime<Utc>,
    ) -> DomainResult<PostedEntry> {
        self.post_entry(txn, spec, None, now)
    }

    /// Produce the negated entry for `journal_entry_id`.
    ///
    /// The original is never mutated beyond the `reversed_by` back-link;
    /// reversing twice fails.
    pub fn reverse(
        &self,
        txn: &mut Txn,
        journal_entry_id: JournalEntryId,
        now: DateTime<Utc>,
    ) -> DomainResult<PostedEntry> {
        let mut original = txn.journal_entry(journal_entry_id)?;
        if original.reversed_by.is_some() {
            return Err(DomainError::already_reversed(journal_entry_id));
        }

        let postings = txn.postings_for_entry(journal_entry_id);
        let spec = JournalEntrySpec::reversal_of(&postings);
        let posted = self.post_entry(txn, spec, Some(journal_entry_id), now)?;

        original.reversed_by = Some(posted.entry.id);
        txn.update_journal_entry(original)?;

        debug!(original = %journal_entry_id, reversal = %posted.entry.id, "journal entry reversed");
        Ok(posted)
    }

    fn post_entry(
        &self,
        txn: &mut Txn,
        spec: JournalEntrySpec,
        reversal_of: Option<JournalEntryId>,
        now: DateTime<Utc>,
    ) -> DomainResult<PostedEntry> {
        let currency = spec.validate()?;

        // Every referenced ledger account must exist and match the entry's
        // currency; a mismatch is a defect, not a business outcome.
        for posting in &spec.postings {
            let ledger_account = txn.ledger_account(posting.ledger_account_id)?;
            if ledger_account.currency != currency {
                return Err(DomainError::CurrencyMismatch {
                    expected: ledger_account.currency,
                    found: currency,
                });
            }
        }

        let mut entry = JournalEntry::new(now);
        entry.reversal_of = reversal_of;
        txn.insert_journal_entry(entry.clone())?;

        let mut postings = Vec::with_capacity(spec.postings.len());
        for line in &spec.postings {
            let posting = Posting {
                id: PostingId::new(),
                journal_entry_id: entry.id,
                ledger_account_id: line.ledger_account_id,
                amount: line.amount,
                effective_date: now,
                version: 0,
            };
            txn.insert_posting(posting.clone())?;

            // Maintain the cached balance of the affected account view, if
            // one exists (clearing accounts have none).
            if let Some(mut account) = txn.account_by_ledger_account(line.ledger_account_id) {
                account.ledger_balance = account.ledger_balance.add(&line.amount)?;
                txn.update_account(account)?;
            }

            postings.push(posting);
        }

        debug!(entry = %entry.id, postings = postings.len(), "journal entry posted");
        Ok(PostedEntry { entry, postings })
    }
}
