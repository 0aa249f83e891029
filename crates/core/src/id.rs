//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! impl_uuid_newtype {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(
    /// Identifier of a business (tenant boundary).
    BusinessId,
    "BusinessId"
);
impl_uuid_newtype!(
    /// Identifier of an allocation (a named sub-account of a business).
    AllocationId,
    "AllocationId"
);
impl_uuid_newtype!(
    /// Identifier of an issued payment card.
    CardId,
    "CardId"
);
impl_uuid_newtype!(
    /// Identifier of a balance-carrying account view.
    AccountId,
    "AccountId"
);
impl_uuid_newtype!(
    /// Identifier of a ledger account (typed, currency-scoped bucket).
    LedgerAccountId,
    "LedgerAccountId"
);
impl_uuid_newtype!(
    /// Identifier of a journal entry.
    JournalEntryId,
    "JournalEntryId"
);
impl_uuid_newtype!(
    /// Identifier of a single posting within a journal entry.
    PostingId,
    "PostingId"
);
impl_uuid_newtype!(
    /// Identifier of a hold against an account.
    HoldId,
    "HoldId"
);
impl_uuid_newtype!(
    /// Identifier of an adjustment (realized balance change).
    AdjustmentId,
    "AdjustmentId"
);
impl_uuid_newtype!(
    /// Identifier of an inbound network message.
    NetworkMessageId,
    "NetworkMessageId"
);
impl_uuid_newtype!(
    /// Correlates every network message of one card-transaction lifecycle.
    MessageGroupId,
    "MessageGroupId"
);
impl_uuid_newtype!(
    /// Identifier of an account-activity row.
    ActivityId,
    "ActivityId"
);
impl_uuid_newtype!(
    /// Identifier of a transaction-limit record.
    TransactionLimitId,
    "TransactionLimitId"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_from_str() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_malformed_identifier() {
        let err = "not-a-uuid".parse::<HoldId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) => assert!(msg.contains("HoldId")),
            other => panic!("expected InvalidId, got {other:?}"),
        }
    }
}
