use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use tally_accounts::{Account, AccountType, Adjustment, Hold};
use tally_activity::{AccountActivity, ActivityFilter, ActivityType, Page};
use tally_core::{
    AccountId, AllocationId, Amount, BusinessId, CardId, Currency, DomainError, DomainResult,
    HoldId, JournalEntryId,
};
use tally_network::{NetworkAck, NetworkRequest, TransactionLimit};

use crate::services::accounts::DepositRecord;
use crate::services::adjustments::ReallocatedFunds;
use crate::services::ledger::PostedEntry;
use crate::services::{
    AccountService, ActivityService, AdjustmentService, HoldService, LedgerService,
    NetworkMessageService, TransactionLimitService,
};
use crate::store::InMemoryStore;

/// Read-only permission check over allocations, supplied by the caller.
///
/// Permission resolution over the allocation hierarchy is an external
/// concern; this core only consults it before returning activity data,
/// never before writing it.
pub trait AllocationVisibility {
    fn can_view(&self, allocation_id: AllocationId) -> bool;
}

/// Visibility for internal/service callers.
pub struct PermitAll;

impl AllocationVisibility for PermitAll {
    fn can_view(&self, _allocation_id: AllocationId) -> bool {
        true
    }
}

/// Balance pair returned to collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalances {
    pub account_id: AccountId,
    pub ledger_balance: Amount,
    pub available_balance: Amount,
}

/// The exposed surface of the ledger core.
///
/// Every method is one transaction: begin, decide, commit. A `Conflict`
/// propagates to the caller, who retries from the top with fresh state —
/// nothing is retried in here.
#[derive(Default)]
pub struct Platform {
    store: Arc<InMemoryStore>,
    ledger: LedgerService,
    accounts: AccountService,
    holds: HoldService,
    adjustments: AdjustmentService,
    activity: ActivityService,
    network: NetworkMessageService,
    limits: TransactionLimitService,
}

impl Platform {
    pub fn new() -> Self {
        Self::default()
    }

    // --- provisioning (driven by the onboarding collaborator) ---

    pub fn create_allocation_account(
        &self,
        business_id: BusinessId,
        allocation_id: AllocationId,
        currency: Currency,
    ) -> DomainResult<Account> {
        self.store.transact(|txn| {
            self.accounts.create_account(
                txn,
                business_id,
                allocation_id,
                None,
                AccountType::Allocation,
                currency,
            )
        })
    }

    pub fn create_card_account(
        &self,
        business_id: BusinessId,
        allocation_id: AllocationId,
        card_id: CardId,
        currency: Currency,
    ) -> DomainResult<Account> {
        self.store.transact(|txn| {
            self.accounts.create_account(
                txn,
                business_id,
                allocation_id,
                Some(card_id),
                AccountType::Card,
                currency,
            )
        })
    }

    /// Link an issued card to the account that funds its spend (cards may
    /// draw from their allocation's account or carry their own).
    pub fn register_card(&self, card_id: CardId, account_id: AccountId) -> DomainResult<Account> {
        self.store.transact(|txn| {
            let mut account = txn.account(account_id)?;
            account.card_id = Some(card_id);
            txn.update_account(account.clone())?;
            Ok(account)
        })
    }

    // --- fund movement ---

    pub fn deposit_funds(
        &self,
        account_id: AccountId,
        amount: Amount,
        place_hold: bool,
        bank_name: &str,
        bank_last_four: &str,
    ) -> DomainResult<DepositRecord> {
        let now = Utc::now();
        self.store.transact(|txn| {
            self.accounts.deposit_funds(
                txn,
                account_id,
                amount,
                place_hold,
                bank_name,
                bank_last_four,
                now,
            )
        })
    }

    pub fn withdraw_funds(
        &self,
        account_id: AccountId,
        amount: Amount,
        bank_name: &str,
        bank_last_four: &str,
    ) -> DomainResult<(Account, Adjustment)> {
        let now = Utc::now();
        self.store.transact(|txn| {
            self.accounts
                .withdraw_funds(txn, account_id, amount, bank_name, bank_last_four, now)
        })
    }

    pub fn reallocate_funds(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: Amount,
    ) -> DomainResult<ReallocatedFunds> {
        let now = Utc::now();
        self.store.transact(|txn| {
            self.accounts
                .reallocate_funds(txn, from_account_id, to_account_id, amount, now)
        })
    }

    /// Close out a card account: move its remaining balance back to the
    /// owning allocation.
    pub fn return_card_funds(&self, card_account_id: AccountId) -> DomainResult<ReallocatedFunds> {
        let now = Utc::now();
        self.store.transact(|txn| {
            let card_account = txn.account(card_account_id)?;
            let amount = card_account.ledger_balance;
            amount.ensure_positive()?;

            let allocation_account = txn
                .account_by_allocation(
                    card_account.business_id,
                    card_account.allocation_id,
                    amount.currency(),
                )
                .ok_or_else(|| {
                    DomainError::not_found("account for allocation", card_account.allocation_id)
                })?;

            let moved = self.adjustments.record_card_return(
                txn,
                &card_account,
                &allocation_account,
                amount,
                now,
            )?;
            self.activity.record_adjustment(
                txn,
                &card_account,
                &moved.from_adjustment,
                ActivityType::CardFundReturn,
                "card funds returned",
            )?;
            self.activity.record_adjustment(
                txn,
                &allocation_account,
                &moved.to_adjustment,
                ActivityType::CardFundReturn,
                "card funds returned",
            )?;
            Ok(moved)
        })
    }

    // --- holds ---

    pub fn place_hold(
        &self,
        account_id: AccountId,
        amount: Amount,
        expiration_date: DateTime<Utc>,
    ) -> DomainResult<Hold> {
        let now = Utc::now();
        self.store.transact(|txn| {
            let account = txn.account(account_id)?;
            self.holds.place(txn, &account, amount, expiration_date, now)
        })
    }

    /// Idempotent: releasing an already-released hold returns `None`.
    pub fn release_hold(&self, hold_id: HoldId) -> DomainResult<Option<Hold>> {
        let now = Utc::now();
        self.store.transact(|txn| {
            let released = self.holds.release(txn, hold_id)?;
            if released.is_some() {
                self.activity.hide_for_hold(txn, hold_id, now)?;
            }
            Ok(released)
        })
    }

    /// Capture a placed hold and post the settled amount to the network
    /// clearing account in the same transaction.
    pub fn capture_hold(
        &self,
        hold_id: HoldId,
        settled_amount: Amount,
    ) -> DomainResult<(Hold, Adjustment)> {
        let now = Utc::now();
        self.store.transact(|txn| {
            let hold = self.holds.capture(txn, hold_id, settled_amount)?;
            self.activity.hide_for_hold(txn, hold_id, now)?;
            let account = txn.account(hold.account_id)?;
            let adjustment = self
                .adjustments
                .record_network(txn, &account, settled_amount, now)?;
            Ok((hold, adjustment))
        })
    }

    // --- adjustments / ledger ---

    pub fn post_manual_adjustment(
        &self,
        account_id: AccountId,
        amount: Amount,
        notes: &str,
    ) -> DomainResult<Adjustment> {
        let now = Utc::now();
        self.store.transact(|txn| {
            let account = txn.account(account_id)?;
            let adjustment = self.adjustments.record_manual(txn, &account, amount, now)?;
            self.activity
                .record_adjustment(txn, &account, &adjustment, ActivityType::Manual, notes)?;
            Ok(adjustment)
        })
    }

    pub fn apply_fee(
        &self,
        account_id: AccountId,
        amount: Amount,
        notes: &str,
    ) -> DomainResult<Adjustment> {
        let now = Utc::now();
        self.store.transact(|txn| {
            let account = txn.account(account_id)?;
            let adjustment = self.adjustments.record_fee(txn, &account, amount, now)?;
            self.activity
                .record_adjustment(txn, &account, &adjustment, ActivityType::Fee, notes)?;
            Ok(adjustment)
        })
    }

    pub fn reverse_journal_entry(&self, journal_entry_id: JournalEntryId) -> DomainResult<PostedEntry> {
        let now = Utc::now();
        self.store
            .transact(|txn| self.ledger.reverse(txn, journal_entry_id, now))
    }

    // --- network ---

    pub fn process_network_message(&self, request: &NetworkRequest) -> DomainResult<NetworkAck> {
        let now = Utc::now();
        self.store.transact(|txn| self.network.process(txn, request, now))
    }

    // --- limits ---

    pub fn upsert_transaction_limit(
        &self,
        limit: TransactionLimit,
    ) -> DomainResult<TransactionLimit> {
        self.store.transact(|txn| self.limits.upsert(txn, limit))
    }

    // --- reads ---

    pub fn get_account(
        &self,
        business_id: BusinessId,
        allocation_id: AllocationId,
        currency: Currency,
    ) -> DomainResult<AccountBalances> {
        let txn = self.store.begin()?;
        let account = txn
            .account_by_allocation(business_id, allocation_id, currency)
            .ok_or_else(|| DomainError::not_found("account for allocation", allocation_id))?;
        let available = account.available_balance(&txn.placed_holds_for_account(account.id))?;
        Ok(AccountBalances {
            account_id: account.id,
            ledger_balance: account.ledger_balance,
            available_balance: available,
        })
    }

    pub fn account_balances(&self, account_id: AccountId) -> DomainResult<AccountBalances> {
        let txn = self.store.begin()?;
        let (ledger_balance, available_balance) = self.accounts.balances(&txn, account_id)?;
        Ok(AccountBalances {
            account_id,
            ledger_balance,
            available_balance,
        })
    }

    pub fn find_account_activity(
        &self,
        filter: &ActivityFilter,
    ) -> DomainResult<Page<AccountActivity>> {
        self.find_account_activity_visible_to(filter, &PermitAll)
    }

    /// Activity query filtered by the caller's allocation permissions.
    pub fn find_account_activity_visible_to(
        &self,
        filter: &ActivityFilter,
        visibility: &dyn AllocationVisibility,
    ) -> DomainResult<Page<AccountActivity>> {
        let txn = self.store.begin()?;
        Ok(self
            .activity
            .find(&txn, filter, Utc::now(), |allocation_id| {
                visibility.can_view(allocation_id)
            }))
    }

    // --- maintenance ---

    /// Release every placed hold past its expiration and hide its pending
    /// activity. Returns the number released.
    pub fn run_hold_expiry_sweep(&self, now: DateTime<Utc>) -> DomainResult<usize> {
        self.store.transact(|txn| {
            let released = self.holds.expire_due(txn, now)?;
            for hold in &released {
                self.activity.hide_for_hold(txn, hold.id, now)?;
            }
            if !released.is_empty() {
                info!(count = released.len(), "hold expiry sweep released holds");
            }
            Ok(released.len())
        })
    }
}
