use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{
    AccountId, AdjustmentId, AllocationId, Amount, BusinessId, Entity, JournalEntryId,
    LedgerAccountId, PostingId,
};

/// What kind of realized balance change an adjustment records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Deposit,
    Withdraw,
    Reallocate,
    Network,
    Manual,
    Fee,
    Return,
}

/// The durable record of one realized balance change.
///
/// Always backed by exactly one journal entry; `posting_id` points at the
/// posting on this account's own ledger account. Never edited — a mistake is
/// superseded by a reversal's own adjustment + journal entry pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: AdjustmentId,
    pub business_id: BusinessId,
    pub allocation_id: AllocationId,
    pub account_id: AccountId,
    pub ledger_account_id: LedgerAccountId,
    pub journal_entry_id: JournalEntryId,
    pub posting_id: PostingId,
    pub adjustment_type: AdjustmentType,
    pub amount: Amount,
    pub effective_date: DateTime<Utc>,
    pub version: u64,
}

impl Adjustment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        business_id: BusinessId,
        allocation_id: AllocationId,
        account_id: AccountId,
        ledger_account_id: LedgerAccountId,
        journal_entry_id: JournalEntryId,
        posting_id: PostingId,
        adjustment_type: AdjustmentType,
        amount: Amount,
        effective_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AdjustmentId::new(),
            business_id,
            allocation_id,
            account_id,
            ledger_account_id,
            journal_entry_id,
            posting_id,
            adjustment_type,
            amount,
            effective_date,
            version: 0,
        }
    }
}

impl Entity for Adjustment {
    type Id = AdjustmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
