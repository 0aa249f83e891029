use chrono::{DateTime, Utc};

use tally_accounts::{Account, Adjustment, AdjustmentType};
use tally_core::{AdjustmentId, Amount, DomainError, DomainResult};
use tally_ledger::{JournalEntrySpec, LedgerAccountType};

use crate::services::ledger::{LedgerService, PostedEntry};
use crate::store::Txn;

/// Funds moved between two sibling accounts, with both adjustment records.
#[derive(Debug, Clone)]
pub struct ReallocatedFunds {
    pub entry: PostedEntry,
    pub from_adjustment: Adjustment,
    pub to_adjustment: Adjustment,
}

/// Records realized balance changes: one journal entry, one adjustment per
/// affected account.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjustmentService {
    ledger: LedgerService,
}

impl AdjustmentService {
    /// Deposit from the linked bank: bank clearing -> account.
    pub fn record_deposit(
        &self,
        txn: &mut Txn,
        account: &Account,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> DomainResult<Adjustment> {
        amount.ensure_positive()?;
        self.clearing_transfer(
            txn,
            account,
            LedgerAccountType::Bank,
            AdjustmentType::Deposit,
            amount,
            now,
        )
    }

    /// Withdrawal to the linked bank: account -> bank clearing.
    pub fn record_withdrawal(
        &self,
        txn: &mut Txn,
        account: &Account,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> DomainResult<Adjustment> {
        amount.ensure_positive()?;
        self.clearing_transfer(
            txn,
            account,
            LedgerAccountType::Bank,
            AdjustmentType::Withdraw,
            amount.negate(),
            now,
        )
    }

    /// Card-network settlement. `amount` is signed: negative consumes funds
    /// (capture), positive returns them (refund).
    pub fn record_network(
        &self,
        txn: &mut Txn,
        account: &Account,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> DomainResult<Adjustment> {
        self.clearing_transfer(
            txn,
            account,
            LedgerAccountType::Network,
            AdjustmentType::Network,
            amount,
            now,
        )
    }

    /// Operator-initiated correction against the manual clearing account.
    pub fn record_manual(
        &self,
        txn: &mut Txn,
        account: &Account,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> DomainResult<Adjustment> {
        self.clearing_transfer(
            txn,
            account,
            LedgerAccountType::Manual,
            AdjustmentType::Manual,
            amount,
            now,
        )
    }

    /// Platform fee (negative amount) against the manual clearing account.
    pub fn record_fee(
        &self,
        txn: &mut Txn,
        account: &Account,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> DomainResult<Adjustment> {
        amount.ensure_negative()?;
        self.clearing_transfer(
            txn,
            account,
            LedgerAccountType::Manual,
            AdjustmentType::Fee,
            amount,
            now,
        )
    }

    /// Move funds between two accounts of the same business, producing one
    /// journal entry and an adjustment per side.
    pub fn record_reallocation(
        &self,
        txn: &mut Txn,
        from: &Account,
        to: &Account,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> DomainResult<ReallocatedFunds> {
        amount.ensure_positive()?;
        self.paired_transfer(txn, from, to, amount, AdjustmentType::Reallocate, now)
    }

    /// Return a closed card account's remaining funds to its allocation.
    pub fn record_card_return(
        &self,
        txn: &mut Txn,
        card_account: &Account,
        allocation_account: &Account,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> DomainResult<ReallocatedFunds> {
        amount.ensure_positive()?;
        self.paired_transfer(
            txn,
            card_account,
            allocation_account,
            amount,
            AdjustmentType::Return,
            now,
        )
    }

    /// Reverse a posted network adjustment: negate its journal entry and
    /// record the inverse adjustment on the same account.
    pub fn reverse_network_adjustment(
        &self,
        txn: &mut Txn,
        adjustment_id: AdjustmentId,
        now: DateTime<Utc>,
    ) -> DomainResult<Adjustment> {
        let original = txn.adjustment(adjustment_id)?;
        let account = txn.account(original.account_id)?;

        let reversal = self.ledger.reverse(txn, original.journal_entry_id, now)?;
        self.save_adjustment(
            txn,
            &account,
            &reversal,
            AdjustmentType::Network,
            original.amount.negate(),
            now,
        )
    }

    fn clearing_transfer(
        &self,
        txn: &mut Txn,
        account: &Account,
        clearing_type: LedgerAccountType,
        adjustment_type: AdjustmentType,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> DomainResult<Adjustment> {
        let clearing = self
            .ledger
            .get_or_create_clearing(txn, clearing_type, amount.currency())?;

        let spec = JournalEntrySpec::transfer(clearing.id, account.ledger_account_id, amount);
        let posted = self.ledger.post(txn, spec, now)?;

        self.save_adjustment(txn, account, &posted, adjustment_type, amount, now)
    }

    fn paired_transfer(
        &self,
        txn: &mut Txn,
        from: &Account,
        to: &Account,
        amount: Amount,
        adjustment_type: AdjustmentType,
        now: DateTime<Utc>,
    ) -> DomainResult<ReallocatedFunds> {
        let spec =
            JournalEntrySpec::transfer(from.ledger_account_id, to.ledger_account_id, amount);
        let entry = self.ledger.post(txn, spec, now)?;

        let from_adjustment = self.save_adjustment(
            txn,
            from,
            &entry,
            adjustment_type,
            amount.negate(),
            now,
        )?;
        let to_adjustment =
            self.save_adjustment(txn, to, &entry, adjustment_type, amount, now)?;

        Ok(ReallocatedFunds {
            entry,
            from_adjustment,
            to_adjustment,
        })
    }

    fn save_adjustment(
        &self,
        txn: &mut Txn,
        account: &Account,
        posted: &PostedEntry,
        adjustment_type: AdjustmentType,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> DomainResult<Adjustment> {
        let posting = posted
            .posting_for(account.ledger_account_id)
            .ok_or_else(|| {
                DomainError::not_found("posting for ledger_account", account.ledger_account_id)
            })?;

        let adjustment = Adjustment::new(
            account.business_id,
            account.allocation_id,
            account.id,
            account.ledger_account_id,
            posted.entry.id,
            posting.id,
            adjustment_type,
            amount,
            now,
        );
        txn.insert_adjustment(adjustment.clone())?;
        Ok(adjustment)
    }
}
