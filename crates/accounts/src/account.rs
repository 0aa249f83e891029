use serde::{Deserialize, Serialize};

use tally_core::{
    AccountId, AllocationId, Amount, BusinessId, CardId, DomainResult, Entity, LedgerAccountId,
};
use tally_ledger::LedgerAccountType;

use crate::hold::{Hold, HoldStatus};

/// What the account is a balance view for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Allocation,
    Card,
}

impl AccountType {
    pub fn ledger_account_type(&self) -> LedgerAccountType {
        match self {
            AccountType::Allocation => LedgerAccountType::Allocation,
            AccountType::Card => LedgerAccountType::Card,
        }
    }
}

/// Per-allocation (or per-card) cached balance view.
///
/// `ledger_balance` is the sum of settled postings against the backing
/// ledger account, maintained in the same transaction as every posting.
/// The available balance is *derived*, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub business_id: BusinessId,
    pub allocation_id: AllocationId,
    pub card_id: Option<CardId>,
    pub ledger_account_id: LedgerAccountId,
    pub account_type: AccountType,
    pub ledger_balance: Amount,
    pub version: u64,
}

impl Account {
    pub fn new(
        business_id: BusinessId,
        allocation_id: AllocationId,
        card_id: Option<CardId>,
        ledger_account_id: LedgerAccountId,
        account_type: AccountType,
        ledger_balance: Amount,
    ) -> Self {
        Self {
            id: AccountId::new(),
            business_id,
            allocation_id,
            card_id,
            ledger_account_id,
            account_type,
            ledger_balance,
            version: 0,
        }
    }

    /// `ledger_balance + Σ(amount of PLACED holds)`, same currency only.
    ///
    /// Hold amounts are negative, so placed holds reduce availability.
    pub fn available_balance(&self, holds: &[Hold]) -> DomainResult<Amount> {
        let mut available = self.ledger_balance;
        for hold in holds {
            if hold.account_id != self.id || hold.status != HoldStatus::Placed {
                continue;
            }
            if hold.amount.currency() != self.ledger_balance.currency() {
                continue;
            }
            available = available.add(&hold.amount)?;
        }
        Ok(available)
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
