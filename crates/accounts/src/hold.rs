use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{AccountId, Amount, BusinessId, DomainError, DomainResult, Entity, HoldId};

/// Hold lifecycle: `Placed -> {Released, Captured}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldStatus {
    Placed,
    Released,
    Captured,
}

impl core::fmt::Display for HoldStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            HoldStatus::Placed => "placed",
            HoldStatus::Released => "released",
            HoldStatus::Captured => "captured",
        };
        f.write_str(s)
    }
}

/// A temporary reservation against an account's available balance.
///
/// The amount is negative while the hold reserves funds. Every hold must
/// leave `Placed` before its expiration; the expiry sweep forces `Released`
/// on any that remain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub id: HoldId,
    pub business_id: BusinessId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub status: HoldStatus,
    /// Set on capture; may differ from `amount` (partial capture).
    pub captured_amount: Option<Amount>,
    pub expiration_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Hold {
    pub fn place(
        business_id: BusinessId,
        account_id: AccountId,
        amount: Amount,
        expiration_date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HoldId::new(),
            business_id,
            account_id,
            amount,
            status: HoldStatus::Placed,
            captured_amount: None,
            expiration_date,
            created_at,
            version: 0,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.status == HoldStatus::Placed
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date <= now
    }

    /// `Placed -> Released`.
    ///
    /// Callers that want idempotent release must check `is_placed` first;
    /// the transition itself is strict.
    pub fn release(&mut self) -> DomainResult<()> {
        self.transition_from_placed(HoldStatus::Released)?;
        Ok(())
    }

    /// `Placed -> Captured`, recording the settled amount.
    ///
    /// The settled amount may be smaller in magnitude than the reservation;
    /// the remainder frees implicitly since only `Placed` holds reduce
    /// availability.
    pub fn capture(&mut self, settled_amount: Amount) -> DomainResult<()> {
        settled_amount.ensure_negative()?;
        self.transition_from_placed(HoldStatus::Captured)?;
        self.captured_amount = Some(settled_amount);
        Ok(())
    }

    fn transition_from_placed(&mut self, to: HoldStatus) -> DomainResult<()> {
        if self.status != HoldStatus::Placed {
            return Err(DomainError::invalid_transition(self.status, to));
        }
        self.status = to;
        Ok(())
    }
}

impl Entity for Hold {
    type Id = HoldId;

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
    use chrono::Duration;
    use tally_core::Currency;

    fn usd(units: i64) -> Amount {
        Amount::new(Currency::Usd, units)
    }

    fn hold(units: i64) -> Hold {
        Hold::place(
            BusinessId::new(),
            AccountId::new(),
            usd(units),
            Utc::now() + Duration::days(2),
            Utc::now(),
        )
    }

    #[test]
    fn capture_records_settled_amount() {
        let mut h = hold(-3_000);
        h.capture(usd(-2_500)).unwrap();
        assert_eq!(h.status, HoldStatus::Captured);
        assert_eq!(h.captured_amount, Some(usd(-2_500)));
    }

    #[test]
    fn capture_requires_negative_settlement() {
        let mut h = hold(-3_000);
        assert!(h.capture(usd(2_500)).is_err());
        assert_eq!(h.status, HoldStatus::Placed);
    }

    #[test]
    fn released_hold_cannot_be_captured() {
        let mut h = hold(-3_000);
        h.release().unwrap();
        let err = h.capture(usd(-3_000)).unwrap_err();
        assert_eq!(
            err,
            DomainError::invalid_transition(HoldStatus::Released, HoldStatus::Captured)
        );
    }

    #[test]
    fn double_release_is_a_transition_error() {
        let mut h = hold(-3_000);
        h.release().unwrap();
        assert!(h.release().is_err());
    }

    #[test]
    fn expiry_check_is_inclusive() {
        let now = Utc::now();
        let mut h = hold(-100);
        h.expiration_date = now;
        assert!(h.is_expired(now));
        h.expiration_date = now + Duration::seconds(1);
        assert!(!h.is_expired(now));
    }
}
