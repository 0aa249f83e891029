use serde::{Deserialize, Serialize};

use tally_core::{Currency, Entity, LedgerAccountId};

/// Ledger account kind.
///
/// `Allocation` and `Card` accounts are created per owner; `Bank`, `Network`
/// and `Manual` are shared clearing accounts, one per currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAccountType {
    Allocation,
    Card,
    Bank,
    Network,
    Manual,
}

impl LedgerAccountType {
    /// Clearing accounts are get-or-created lazily, one per currency.
    pub fn is_clearing(&self) -> bool {
        matches!(
            self,
            LedgerAccountType::Bank | LedgerAccountType::Network | LedgerAccountType::Manual
        )
    }

    /// Types that may be created explicitly when an owner is provisioned.
    pub fn is_owner_scoped(&self) -> bool {
        !self.is_clearing()
    }
}

impl core::fmt::Display for LedgerAccountType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            LedgerAccountType::Allocation => "allocation",
            LedgerAccountType::Card => "card",
            LedgerAccountType::Bank => "bank",
            LedgerAccountType::Network => "network",
            LedgerAccountType::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// A typed, currency-scoped bucket that postings move money into and out of.
///
/// Immutable after creation; its balance only changes through new postings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub id: LedgerAccountId,
    pub account_type: LedgerAccountType,
    pub currency: Currency,
    pub version: u64,
}

impl LedgerAccount {
    pub fn new(account_type: LedgerAccountType, currency: Currency) -> Self {
        Self {
            id: LedgerAccountId::new(),
            account_type,
            currency,
            version: 0,
        }
    }
}

impl Entity for LedgerAccount {
    type Id = LedgerAccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearing_classification() {
        assert!(LedgerAccountType::Network.is_clearing());
        assert!(LedgerAccountType::Bank.is_clearing());
        assert!(LedgerAccountType::Manual.is_clearing());
        assert!(LedgerAccountType::Allocation.is_owner_scoped());
        assert!(LedgerAccountType::Card.is_owner_scoped());
    }
}
