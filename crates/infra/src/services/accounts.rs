use chrono::{DateTime, Duration, Utc};
use tracing::info;

use tally_accounts::{Account, AccountType, Adjustment, Hold};
use tally_activity::ActivityType;
use tally_core::{
    AccountId, AllocationId, Amount, BusinessId, CardId, Currency, DomainError, DomainResult,
};

use crate::services::activity::ActivityService;
use crate::services::adjustments::{AdjustmentService, ReallocatedFunds};
use crate::services::ledger::LedgerService;
use crate::store::Txn;

/// Bank funds clear into availability after this window when a deposit is
/// placed with a hold.
const DEPOSIT_HOLD_DAYS: i64 = 5;

/// Account provisioning and synchronous fund movement.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountService {
    ledger: LedgerService,
    adjustments: AdjustmentService,
    activity: ActivityService,
}

/// Result of a deposit: the adjustment plus the availability hold, if one
/// was placed.
#[derive(Debug, Clone)]
pub struct DepositRecord {
    pub account: Account,
    pub adjustment: Adjustment,
    pub hold: Option<Hold>,
}

impl AccountService {
    /// Provision the account (and its ledger account) for an allocation or
    /// card. Called by the onboarding collaborator, never by money movement.
    pub fn create_account(
        &self,
        txn: &mut Txn,
        business_id: BusinessId,
        allocation_id: AllocationId,
        card_id: Option<CardId>,
        account_type: AccountType,
        currency: Currency,
    ) -> DomainResult<Account> {
        let ledger_account = self.ledger.create_ledger_account(
            txn,
            account_type.ledger_account_type(),
            currency,
        )?;

        let account = Account::new(
            business_id,
            allocation_id,
            card_id,
            ledger_account.id,
            account_type,
            Amount::zero(currency),
        );
        txn.insert_account(account.clone())?;
        info!(account = %account.id, %business_id, "account created");
        Ok(account)
    }

    /// Deposit from the linked bank account. With `place_hold`, the funds
    /// land on the ledger immediately but availability lags behind a
    /// five-day hold (standard bank settlement guard).
    pub fn deposit_funds(
        &self,
        txn: &mut Txn,
        account_id: AccountId,
        amount: Amount,
        place_hold: bool,
        bank_name: &str,
        bank_last_four: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<DepositRecord> {
        amount.ensure_positive()?;
        let account = txn.account(account_id)?;

        let adjustment = self.adjustments.record_deposit(txn, &account, amount, now)?;

        let hold = if place_hold {
            let hold = Hold::place(
                account.business_id,
                account.id,
                amount.negate(),
                now + Duration::days(DEPOSIT_HOLD_DAYS),
                now,
            );
            txn.insert_hold(hold.clone())?;
            Some(hold)
        } else {
            None
        };

        self.activity.record_bank_transfer(
            txn,
            &account,
            ActivityType::BankDeposit,
            &adjustment,
            hold.as_ref(),
            bank_name,
            bank_last_four,
        )?;

        let account = txn.account(account_id)?;
        Ok(DepositRecord {
            account,
            adjustment,
            hold,
        })
    }

    /// Withdraw to the linked bank account; fails when the available
    /// balance cannot cover it.
    pub fn withdraw_funds(
        &self,
        txn: &mut Txn,
        account_id: AccountId,
        amount: Amount,
        bank_name: &str,
        bank_last_four: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<(Account, Adjustment)> {
        amount.ensure_positive()?;
        let account = txn.account(account_id)?;

        let available = account.available_balance(&txn.placed_holds_for_account(account.id))?;
        if available.is_less_than(&amount) {
            return Err(DomainError::insufficient_funds(account.id, amount));
        }

        let adjustment = self
            .adjustments
            .record_withdrawal(txn, &account, amount, now)?;
        self.activity.record_bank_transfer(
            txn,
            &account,
            ActivityType::BankWithdrawal,
            &adjustment,
            None,
            bank_name,
            bank_last_four,
        )?;

        let account = txn.account(account_id)?;
        Ok((account, adjustment))
    }

    /// Move funds between two allocations of the same business: one journal
    /// entry, two postings, two adjustments, two activity rows — one
    /// transaction.
    pub fn reallocate_funds(
        &self,
        txn: &mut Txn,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> DomainResult<ReallocatedFunds> {
        amount.ensure_positive()?;
        if from_account_id == to_account_id {
            return Err(DomainError::validation(format!(
                "from account equals to account: {from_account_id}"
            )));
        }

        let from = txn.account(from_account_id)?;
        let to = txn.account(to_account_id)?;
        if from.business_id != to.business_id {
            return Err(DomainError::validation(format!(
                "accounts belong to different businesses: {} and {}",
                from.business_id, to.business_id
            )));
        }

        let available = from.available_balance(&txn.placed_holds_for_account(from.id))?;
        if available.is_less_than(&amount) {
            return Err(DomainError::insufficient_funds(from.id, amount));
        }

        let moved = self
            .adjustments
            .record_reallocation(txn, &from, &to, amount, now)?;
        self.activity
            .record_reallocation(txn, &from, &moved.from_adjustment, to.allocation_id)?;
        self.activity
            .record_reallocation(txn, &to, &moved.to_adjustment, from.allocation_id)?;

        Ok(moved)
    }

    /// Current (ledger, available) pair for an account.
    pub fn balances(&self, txn: &Txn, account_id: AccountId) -> DomainResult<(Amount, Amount)> {
        let account = txn.account(account_id)?;
        let available = account.available_balance(&txn.placed_holds_for_account(account.id))?;
        Ok((account.ledger_balance, available))
    }
}
