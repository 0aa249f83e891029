use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use tally_activity::ActivityStatus;
use tally_core::{AllocationId, Amount, BusinessId, CardId, DomainResult};
use tally_network::{
    AuthorizationMethod, LimitCheckContext, LimitOwner, LimitViolation, MccGroup, TransactionLimit,
    evaluate_limit,
};

use crate::store::Txn;

/// Stored transaction limits plus velocity aggregation over the activity
/// projection. The limit decision itself is pure (`evaluate_limit`); this
/// service only assembles its inputs — it never writes ledger state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionLimitService;

impl TransactionLimitService {
    /// Create or replace the limit record for an owner.
    pub fn upsert(&self, txn: &mut Txn, limit: TransactionLimit) -> DomainResult<TransactionLimit> {
        match txn.limit_for_owner(limit.business_id, limit.owner) {
            Some(existing) => {
                let mut updated = limit;
                updated.id = existing.id;
                updated.version = existing.version;
                txn.update_limit(updated.clone())?;
                Ok(updated)
            }
            None => {
                txn.insert_limit(limit.clone())?;
                Ok(limit)
            }
        }
    }

    /// Is this card purchase allowed right now?
    ///
    /// Checks the card's limit record and the allocation's, whichever exist.
    /// A pure query: no side effects on the ledger.
    #[allow(clippy::too_many_arguments)]
    pub fn check(
        &self,
        txn: &Txn,
        business_id: BusinessId,
        allocation_id: AllocationId,
        card_id: CardId,
        amount: &Amount,
        mcc: u16,
        authorization_method: Option<AuthorizationMethod>,
        foreign: bool,
        now: DateTime<Utc>,
    ) -> Result<(), LimitViolation> {
        let ctx = LimitCheckContext {
            amount: *amount,
            mcc_group: MccGroup::from_mcc(mcc),
            payment_type: authorization_method.map(|m| m.payment_type()),
            foreign,
            today: now.date_naive(),
        };

        if let Some(limit) = txn.limit_for_owner(business_id, LimitOwner::Card { card_id }) {
            let spend = self.card_spend_by_day(txn, card_id, now);
            evaluate_limit(&limit, &spend, &ctx)?;
        }

        if let Some(limit) =
            txn.limit_for_owner(business_id, LimitOwner::Allocation { allocation_id })
        {
            let spend = self.allocation_spend_by_day(txn, allocation_id, now);
            evaluate_limit(&limit, &spend, &ctx)?;
        }

        Ok(())
    }

    /// Daily card spend (negative minor units). Pending holds count — an
    /// authorized-but-unsettled purchase still consumes velocity — but rows
    /// hidden as superseded (captured/released holds) and declines do not.
    fn card_spend_by_day(
        &self,
        txn: &Txn,
        card_id: CardId,
        now: DateTime<Utc>,
    ) -> BTreeMap<NaiveDate, i64> {
        self.spend_by_day(txn, now, |a| {
            matches!(
                &a.details,
                tally_activity::ActivityDetails::Card { card, .. } if card.card_id == card_id
            )
        })
    }

    fn allocation_spend_by_day(
        &self,
        txn: &Txn,
        allocation_id: AllocationId,
        now: DateTime<Utc>,
    ) -> BTreeMap<NaiveDate, i64> {
        self.spend_by_day(txn, now, |a| {
            a.allocation_id == allocation_id
                && matches!(&a.details, tally_activity::ActivityDetails::Card { .. })
        })
    }

    fn spend_by_day(
        &self,
        txn: &Txn,
        now: DateTime<Utc>,
        select: impl Fn(&tally_activity::AccountActivity) -> bool,
    ) -> BTreeMap<NaiveDate, i64> {
        let mut spend = BTreeMap::new();
        for activity in txn.iter_activities() {
            if !select(activity) || !activity.amount.is_negative() {
                continue;
            }
            if matches!(
                activity.status,
                ActivityStatus::Declined | ActivityStatus::Canceled
            ) {
                continue;
            }
            // Superseded rows (hold captured, released, or expired) are
            // hidden; counting them would double the purchase.
            if !activity.is_visible(now) {
                continue;
            }
            *spend
                .entry(activity.activity_time.date_naive())
                .or_insert(0) += activity.amount.units();
        }
        spend
    }
}
