use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use tally_accounts::{Account, Adjustment, Hold};
use tally_activity::{
    AccountActivity, ActivityDetails, ActivityFilter, ActivityStatus, ActivityType, CardDetails,
    Page, PaymentDetails,
};
use tally_core::{ActivityId, AllocationId, Amount, DomainResult, HoldId};
use tally_network::{DeclineReason, NetworkRequest};

use crate::store::Txn;

/// Declined card activity stays queryable by auditors but drops out of the
/// user view after this many days.
pub const DECLINE_RETENTION_DAYS: i64 = 30;

/// Writes and queries the customer-visible activity projection.
///
/// Rows are written by the operation that caused them, updated in place only
/// to adjust visibility, and never recomputed from the ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityService;

impl ActivityService {
    fn card_details(request: &NetworkRequest) -> CardDetails {
        CardDetails {
            card_id: request.card_id,
            last_four: request.card_last_four.clone(),
        }
    }

    fn payment_details(request: &NetworkRequest) -> Option<PaymentDetails> {
        request.authorization_method.map(|method| PaymentDetails {
            authorization_method: method,
            payment_type: method.payment_type(),
            foreign: request.foreign,
        })
    }

    fn insert(
        &self,
        txn: &mut Txn,
        row: AccountActivity,
    ) -> DomainResult<AccountActivity> {
        txn.insert_activity(row.clone())?;
        Ok(row)
    }

    /// Pending row for a freshly placed authorization hold. Hidden once the
    /// hold would have expired (by then it is either captured or gone).
    pub fn record_network_hold(
        &self,
        txn: &mut Txn,
        account: &Account,
        request: &NetworkRequest,
        hold: &Hold,
    ) -> DomainResult<AccountActivity> {
        self.insert(
            txn,
            AccountActivity {
                id: ActivityId::new(),
                business_id: account.business_id,
                allocation_id: account.allocation_id,
                account_id: account.id,
                adjustment_id: None,
                hold_id: Some(hold.id),
                activity_type: ActivityType::NetworkAuth,
                status: ActivityStatus::Pending,
                amount: hold.amount,
                requested_amount: request.signed_amount(),
                activity_time: hold.created_at,
                hide_after: Some(hold.expiration_date),
                visible_after: None,
                details: ActivityDetails::Card {
                    merchant: request.merchant.clone(),
                    card: Self::card_details(request),
                    payment: Self::payment_details(request),
                },
                version: 0,
            },
        )
    }

    /// Approved capture (or refund) backed by a network adjustment.
    pub fn record_network_adjustment(
        &self,
        txn: &mut Txn,
        account: &Account,
        request: &NetworkRequest,
        adjustment: &Adjustment,
        activity_type: ActivityType,
        status: ActivityStatus,
    ) -> DomainResult<AccountActivity> {
        self.insert(
            txn,
            AccountActivity {
                id: ActivityId::new(),
                business_id: account.business_id,
                allocation_id: account.allocation_id,
                account_id: account.id,
                adjustment_id: Some(adjustment.id),
                hold_id: None,
                activity_type,
                status,
                amount: adjustment.amount,
                requested_amount: request.signed_amount(),
                activity_time: adjustment.effective_date,
                hide_after: None,
                visible_after: None,
                details: ActivityDetails::Card {
                    merchant: request.merchant.clone(),
                    card: Self::card_details(request),
                    payment: Self::payment_details(request),
                },
                version: 0,
            },
        )
    }

    /// Declined authorization: no hold, no adjustment, reasons retained for
    /// audit; hidden from users after the retention window.
    pub fn record_network_decline(
        &self,
        txn: &mut Txn,
        account: &Account,
        request: &NetworkRequest,
        attempted_amount: Amount,
        reasons: Vec<DeclineReason>,
        now: DateTime<Utc>,
    ) -> DomainResult<AccountActivity> {
        self.insert(
            txn,
            AccountActivity {
                id: ActivityId::new(),
                business_id: account.business_id,
                allocation_id: account.allocation_id,
                account_id: account.id,
                adjustment_id: None,
                hold_id: None,
                activity_type: ActivityType::NetworkAuth,
                status: ActivityStatus::Declined,
                amount: attempted_amount,
                requested_amount: request.signed_amount(),
                activity_time: now,
                hide_after: Some(now + Duration::days(DECLINE_RETENTION_DAYS)),
                visible_after: None,
                details: ActivityDetails::CardDecline {
                    merchant: request.merchant.clone(),
                    card: Self::card_details(request),
                    reasons,
                },
                version: 0,
            },
        )
    }

    /// Canceled row written when a reversal releases a still-placed hold.
    pub fn record_hold_canceled(
        &self,
        txn: &mut Txn,
        account: &Account,
        request: &NetworkRequest,
        hold: &Hold,
        now: DateTime<Utc>,
    ) -> DomainResult<AccountActivity> {
        self.insert(
            txn,
            AccountActivity {
                id: ActivityId::new(),
                business_id: account.business_id,
                allocation_id: account.allocation_id,
                account_id: account.id,
                adjustment_id: None,
                hold_id: Some(hold.id),
                activity_type: ActivityType::NetworkAuth,
                status: ActivityStatus::Canceled,
                amount: hold.amount,
                requested_amount: request.signed_amount(),
                activity_time: now,
                hide_after: None,
                visible_after: None,
                details: ActivityDetails::Card {
                    merchant: request.merchant.clone(),
                    card: Self::card_details(request),
                    payment: Self::payment_details(request),
                },
                version: 0,
            },
        )
    }

    /// Deposit/withdrawal rows. A deposit placed with an availability hold
    /// writes two rows: the processed one becomes visible when the funds
    /// do, and a pending one covers the interim.
    pub fn record_bank_transfer(
        &self,
        txn: &mut Txn,
        account: &Account,
        activity_type: ActivityType,
        adjustment: &Adjustment,
        hold: Option<&Hold>,
        bank_name: &str,
        last_four: &str,
    ) -> DomainResult<AccountActivity> {
        let details = ActivityDetails::BankTransfer {
            bank_name: bank_name.to_string(),
            last_four: last_four.to_string(),
        };

        if let Some(hold) = hold {
            self.insert(
                txn,
                AccountActivity {
                    id: ActivityId::new(),
                    business_id: account.business_id,
                    allocation_id: account.allocation_id,
                    account_id: account.id,
                    adjustment_id: None,
                    hold_id: Some(hold.id),
                    activity_type,
                    status: ActivityStatus::Pending,
                    amount: adjustment.amount,
                    requested_amount: adjustment.amount,
                    activity_time: hold.created_at,
                    hide_after: Some(hold.expiration_date),
                    visible_after: None,
                    details: details.clone(),
                    version: 0,
                },
            )?;
        }

        self.insert(
            txn,
            AccountActivity {
                id: ActivityId::new(),
                business_id: account.business_id,
                allocation_id: account.allocation_id,
                account_id: account.id,
                adjustment_id: Some(adjustment.id),
                hold_id: None,
                activity_type,
                status: ActivityStatus::Processed,
                amount: adjustment.amount,
                requested_amount: adjustment.amount,
                activity_time: adjustment.effective_date,
                hide_after: None,
                visible_after: hold.map(|h| h.expiration_date),
                details,
                version: 0,
            },
        )
    }

    /// One row per side of a reallocation, each naming the counterparty.
    pub fn record_reallocation(
        &self,
        txn: &mut Txn,
        account: &Account,
        adjustment: &Adjustment,
        flip_allocation_id: AllocationId,
    ) -> DomainResult<AccountActivity> {
        self.insert(
            txn,
            AccountActivity {
                id: ActivityId::new(),
                business_id: account.business_id,
                allocation_id: account.allocation_id,
                account_id: account.id,
                adjustment_id: Some(adjustment.id),
                hold_id: None,
                activity_type: ActivityType::Reallocate,
                status: ActivityStatus::Processed,
                amount: adjustment.amount,
                requested_amount: adjustment.amount,
                activity_time: adjustment.effective_date,
                hide_after: None,
                visible_after: None,
                details: ActivityDetails::Reallocation { flip_allocation_id },
                version: 0,
            },
        )
    }

    /// Manual adjustment / fee / card-fund-return row.
    pub fn record_adjustment(
        &self,
        txn: &mut Txn,
        account: &Account,
        adjustment: &Adjustment,
        activity_type: ActivityType,
        notes: &str,
    ) -> DomainResult<AccountActivity> {
        self.insert(
            txn,
            AccountActivity {
                id: ActivityId::new(),
                business_id: account.business_id,
                allocation_id: account.allocation_id,
                account_id: account.id,
                adjustment_id: Some(adjustment.id),
                hold_id: None,
                activity_type,
                status: ActivityStatus::Processed,
                amount: adjustment.amount,
                requested_amount: adjustment.amount,
                activity_time: adjustment.effective_date,
                hide_after: None,
                visible_after: None,
                details: ActivityDetails::Manual {
                    notes: notes.to_string(),
                },
                version: 0,
            },
        )
    }

    /// Hide the earliest row written for a hold (it has been superseded by a
    /// capture, reversal, or expiry).
    pub fn hide_for_hold(
        &self,
        txn: &mut Txn,
        hold_id: HoldId,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<AccountActivity>> {
        let Some(mut earliest) = txn.activities_for_hold(hold_id).into_iter().next() else {
            return Ok(None);
        };
        earliest.hide_after = Some(at);
        txn.update_activity(earliest.clone())?;
        debug!(activity = %earliest.id, hold = %hold_id, "activity hidden");
        Ok(Some(earliest))
    }

    /// Page through matching rows, newest first. `can_view` is the caller's
    /// read-only permission check over allocations.
    pub fn find(
        &self,
        txn: &Txn,
        filter: &ActivityFilter,
        now: DateTime<Utc>,
        can_view: impl Fn(AllocationId) -> bool,
    ) -> Page<AccountActivity> {
        let mut matches: Vec<AccountActivity> = txn
            .iter_activities()
            .filter(|a| filter.matches(a, now) && can_view(a.allocation_id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.activity_time
                .cmp(&a.activity_time)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matches.len();
        let items = matches
            .into_iter()
            .skip(filter.page.offset)
            .take(filter.page.limit)
            .collect();
        Page { items, total }
    }
}
