//! The transactional store.
//!
//! `InMemoryStore` stands in for the relational store: every operation runs
//! against a snapshot (`Txn`), stages its writes, and commits atomically.
//! At commit each written row's live version must still equal the version
//! the transaction read — the explicit form of `UPDATE ... WHERE version =
//! expected` plus an affected-row check. Any mismatch aborts the whole
//! commit with `Conflict` and the caller retries from the top with fresh
//! state. Correctness never relies on in-process locks held across the
//! read-decide-write span.

mod memory;
mod table;

pub use memory::InMemoryStore;
pub use table::Versioned;

use chrono::{DateTime, Utc};

use tally_accounts::{Account, Adjustment, Hold, HoldStatus};
use tally_activity::AccountActivity;
use tally_core::{
    AccountId, ActivityId, AdjustmentId, AllocationId, BusinessId, CardId, Currency, DomainError,
    DomainResult, HoldId, JournalEntryId, LedgerAccountId, MessageGroupId, NetworkMessageId, PostingId,
    TransactionLimitId,
};
use tally_ledger::{JournalEntry, LedgerAccount, LedgerAccountType, Posting};
use tally_network::{LimitOwner, NetworkMessage, NetworkMessageType, TransactionLimit};

use table::TxnTable;

macro_rules! impl_versioned {
    ($($t:ty),+ $(,)?) => {
        $(
            impl Versioned for $t {
                fn version(&self) -> u64 {
                    self.version
                }

                fn set_version(&mut self, version: u64) {
                    self.version = version;
                }
            }
        )+
    };
}

impl_versioned!(
    LedgerAccount,
    Account,
    JournalEntry,
    Posting,
    Hold,
    Adjustment,
    NetworkMessage,
    AccountActivity,
    TransactionLimit,
);

/// Row sets, one map per logical table.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub ledger_accounts: std::collections::HashMap<LedgerAccountId, LedgerAccount>,
    pub accounts: std::collections::HashMap<AccountId, Account>,
    pub journal_entries: std::collections::HashMap<JournalEntryId, JournalEntry>,
    pub postings: std::collections::HashMap<PostingId, Posting>,
    pub holds: std::collections::HashMap<HoldId, Hold>,
    pub adjustments: std::collections::HashMap<AdjustmentId, Adjustment>,
    pub network_messages: std::collections::HashMap<NetworkMessageId, NetworkMessage>,
    pub activities: std::collections::HashMap<ActivityId, AccountActivity>,
    pub limits: std::collections::HashMap<TransactionLimitId, TransactionLimit>,
}

/// One unit of work over a snapshot of the tables.
///
/// Reads see the snapshot overlaid with this transaction's own staged
/// writes. Nothing is visible to other transactions until commit.
#[derive(Debug)]
pub struct Txn {
    pub(crate) ledger_accounts: TxnTable<LedgerAccountId, LedgerAccount>,
    pub(crate) accounts: TxnTable<AccountId, Account>,
    pub(crate) journal_entries: TxnTable<JournalEntryId, JournalEntry>,
    pub(crate) postings: TxnTable<PostingId, Posting>,
    pub(crate) holds: TxnTable<HoldId, Hold>,
    pub(crate) adjustments: TxnTable<AdjustmentId, Adjustment>,
    pub(crate) network_messages: TxnTable<NetworkMessageId, NetworkMessage>,
    pub(crate) activities: TxnTable<ActivityId, AccountActivity>,
    pub(crate) limits: TxnTable<TransactionLimitId, TransactionLimit>,
}

impl Txn {
    pub(crate) fn from_snapshot(tables: Tables) -> Self {
        Self {
            ledger_accounts: TxnTable::new(tables.ledger_accounts),
            accounts: TxnTable::new(tables.accounts),
            journal_entries: TxnTable::new(tables.journal_entries),
            postings: TxnTable::new(tables.postings),
            holds: TxnTable::new(tables.holds),
            adjustments: TxnTable::new(tables.adjustments),
            network_messages: TxnTable::new(tables.network_messages),
            activities: TxnTable::new(tables.activities),
            limits: TxnTable::new(tables.limits),
        }
    }

    // --- ledger accounts ---

    pub fn ledger_account(&self, id: LedgerAccountId) -> DomainResult<LedgerAccount> {
        self.ledger_accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("ledger_account", id))
    }

    pub fn insert_ledger_account(&mut self, row: LedgerAccount) -> DomainResult<()> {
        self.ledger_accounts.insert(row.id, row)
    }

    /// Shared clearing account for a (type, currency) pair, if provisioned.
    pub fn find_clearing_account(
        &self,
        account_type: LedgerAccountType,
        currency: Currency,
    ) -> Option<LedgerAccount> {
        self.ledger_accounts
            .iter()
            .find(|a| a.account_type == account_type && a.currency == currency)
            .cloned()
    }

    // --- accounts ---

    pub fn account(&self, id: AccountId) -> DomainResult<Account> {
        self.accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("account", id))
    }

    pub fn insert_account(&mut self, row: Account) -> DomainResult<()> {
        self.accounts.insert(row.id, row)
    }

    pub fn update_account(&mut self, row: Account) -> DomainResult<()> {
        self.accounts.update(row.id, row)
    }

    pub fn account_by_ledger_account(&self, ledger_account_id: LedgerAccountId) -> Option<Account> {
        self.accounts
            .iter()
            .find(|a| a.ledger_account_id == ledger_account_id)
            .cloned()
    }

    pub fn account_by_card(&self, card_id: CardId) -> Option<Account> {
        self.accounts
            .iter()
            .find(|a| a.card_id == Some(card_id))
            .cloned()
    }

    pub fn account_by_allocation(
        &self,
        business_id: BusinessId,
        allocation_id: AllocationId,
        currency: Currency,
    ) -> Option<Account> {
        self.accounts
            .iter()
            .find(|a| {
                a.business_id == business_id
                    && a.allocation_id == allocation_id
                    && a.card_id.is_none()
                    && a.ledger_balance.currency() == currency
            })
            .cloned()
    }

    // --- journal entries & postings ---

    pub fn journal_entry(&self, id: JournalEntryId) -> DomainResult<JournalEntry> {
        self.journal_entries
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("journal_entry", id))
    }

    pub fn insert_journal_entry(&mut self, row: JournalEntry) -> DomainResult<()> {
        self.journal_entries.insert(row.id, row)
    }

    pub fn update_journal_entry(&mut self, row: JournalEntry) -> DomainResult<()> {
        self.journal_entries.update(row.id, row)
    }

    pub fn insert_posting(&mut self, row: Posting) -> DomainResult<()> {
        self.postings.insert(row.id, row)
    }

    /// Postings of one entry in insertion order (ids are time-ordered).
    pub fn postings_for_entry(&self, journal_entry_id: JournalEntryId) -> Vec<Posting> {
        let mut postings: Vec<Posting> = self
            .postings
            .iter()
            .filter(|p| p.journal_entry_id == journal_entry_id)
            .cloned()
            .collect();
        postings.sort_by_key(|p| p.id);
        postings
    }

    // --- holds ---

    pub fn hold(&self, id: HoldId) -> DomainResult<Hold> {
        self.holds
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("hold", id))
    }

    pub fn insert_hold(&mut self, row: Hold) -> DomainResult<()> {
        self.holds.insert(row.id, row)
    }

    pub fn update_hold(&mut self, row: Hold) -> DomainResult<()> {
        self.holds.update(row.id, row)
    }

    pub fn placed_holds_for_account(&self, account_id: AccountId) -> Vec<Hold> {
        let mut holds: Vec<Hold> = self
            .holds
            .iter()
            .filter(|h| h.account_id == account_id && h.status == HoldStatus::Placed)
            .cloned()
            .collect();
        holds.sort_by_key(|h| (h.created_at, h.id));
        holds
    }

    pub fn placed_holds_due(&self, now: DateTime<Utc>) -> Vec<Hold> {
        let mut holds: Vec<Hold> = self
            .holds
            .iter()
            .filter(|h| h.status == HoldStatus::Placed && h.is_expired(now))
            .cloned()
            .collect();
        holds.sort_by_key(|h| (h.expiration_date, h.id));
        holds
    }

    // --- adjustments ---

    pub fn adjustment(&self, id: AdjustmentId) -> DomainResult<Adjustment> {
        self.adjustments
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("adjustment", id))
    }

    pub fn insert_adjustment(&mut self, row: Adjustment) -> DomainResult<()> {
        self.adjustments.insert(row.id, row)
    }

    // --- network messages ---

    pub fn insert_network_message(&mut self, row: NetworkMessage) -> DomainResult<()> {
        self.network_messages.insert(row.id, row)
    }

    /// Duplicate-delivery probe: same external reference and message type.
    pub fn message_by_external_ref(
        &self,
        external_ref: &str,
        message_type: NetworkMessageType,
    ) -> Option<NetworkMessage> {
        self.network_messages
            .iter()
            .find(|m| m.external_ref == external_ref && m.message_type == message_type)
            .cloned()
    }

    /// The earliest message of a card-transaction lifecycle, used to adopt
    /// its group id.
    pub fn earliest_message_by_auth_ref(&self, auth_ref: &str) -> Option<NetworkMessage> {
        self.network_messages
            .iter()
            .filter(|m| m.auth_ref == auth_ref)
            .min_by_key(|m| (m.created_at, m.id))
            .cloned()
    }

    pub fn messages_in_group(&self, group_id: MessageGroupId) -> Vec<NetworkMessage> {
        let mut messages: Vec<NetworkMessage> = self
            .network_messages
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        messages
    }

    // --- activity ---

    pub fn insert_activity(&mut self, row: AccountActivity) -> DomainResult<()> {
        self.activities.insert(row.id, row)
    }

    pub fn update_activity(&mut self, row: AccountActivity) -> DomainResult<()> {
        self.activities.update(row.id, row)
    }

    pub fn activities_for_hold(&self, hold_id: HoldId) -> Vec<AccountActivity> {
        let mut rows: Vec<AccountActivity> = self
            .activities
            .iter()
            .filter(|a| a.hold_id == Some(hold_id))
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.activity_time, a.id));
        rows
    }

    pub fn iter_activities(&self) -> impl Iterator<Item = &AccountActivity> {
        self.activities.iter()
    }

    // --- transaction limits ---

    pub fn limit_for_owner(
        &self,
        business_id: BusinessId,
        owner: LimitOwner,
    ) -> Option<TransactionLimit> {
        self.limits
            .iter()
            .find(|l| l.business_id == business_id && l.owner == owner)
            .cloned()
    }

    pub fn insert_limit(&mut self, row: TransactionLimit) -> DomainResult<()> {
        self.limits.insert(row.id, row)
    }

    pub fn update_limit(&mut self, row: TransactionLimit) -> DomainResult<()> {
        self.limits.update(row.id, row)
    }
}
