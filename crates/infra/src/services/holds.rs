use chrono::{DateTime, Utc};
use tracing::{debug, info};

use tally_accounts::{Account, Hold};
use tally_core::{Amount, DomainError, DomainResult, HoldId};

use crate::store::Txn;

/// Hold lifecycle manager: place, release, capture, expiry sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldService;

impl HoldService {
    /// Reserve `amount` (negative) against the account's available balance.
    pub fn place(
        &self,
        txn: &mut Txn,
        account: &Account,
        amount: Amount,
        expiration_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult<Hold> {
        amount.ensure_negative()?;

        let placed = txn.placed_holds_for_account(account.id);
        let available = account.available_balance(&placed)?;
        if available.add(&amount)?.is_negative() {
            return Err(DomainError::insufficient_funds(account.id, amount.abs()));
        }

        let hold = Hold::place(account.business_id, account.id, amount, expiration_date, now);
        txn.insert_hold(hold.clone())?;
        debug!(hold = %hold.id, account = %account.id, amount = %amount, "hold placed");
        Ok(hold)
    }

    /// Release a hold. Releasing one that is already released is a no-op;
    /// releasing a captured hold is a state error.
    pub fn release(&self, txn: &mut Txn, hold_id: HoldId) -> DomainResult<Option<Hold>> {
        let mut hold = txn.hold(hold_id)?;
        match hold.status {
            tally_accounts::HoldStatus::Released => return Ok(None),
            _ => hold.release()?,
        }
        txn.update_hold(hold.clone())?;
        debug!(hold = %hold.id, "hold released");
        Ok(Some(hold))
    }

    /// Consume a placed hold with the settled (negative) amount. A partial
    /// capture's remainder frees implicitly once the hold leaves `Placed`.
    pub fn capture(
        &self,
        txn: &mut Txn,
        hold_id: HoldId,
        settled_amount: Amount,
    ) -> DomainResult<Hold> {
        let mut hold = txn.hold(hold_id)?;
        hold.capture(settled_amount)?;
        txn.update_hold(hold.clone())?;
        debug!(hold = %hold.id, settled = %settled_amount, "hold captured");
        Ok(hold)
    }

    /// Release every placed hold past its expiration. Returns the released
    /// holds so the caller can hide their activity rows.
    pub fn expire_due(&self, txn: &mut Txn, now: DateTime<Utc>) -> DomainResult<Vec<Hold>> {
        let due = txn.placed_holds_due(now);
        let mut released = Vec::with_capacity(due.len());
        for mut hold in due {
            hold.release()?;
            txn.update_hold(hold.clone())?;
            released.push(hold);
        }
        if !released.is_empty() {
            info!(count = released.len(), "expired holds released");
        }
        Ok(released)
    }
}
