use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{
    AccountId, ActivityId, AdjustmentId, AllocationId, Amount, BusinessId, CardId, Entity, HoldId,
};
use tally_network::{AuthorizationMethod, DeclineReason, Merchant, PaymentType};

/// What kind of event an activity row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    BankDeposit,
    BankWithdrawal,
    Reallocate,
    NetworkAuth,
    NetworkCapture,
    NetworkRefund,
    Fee,
    Manual,
    CardFundReturn,
}

/// Display status of an activity row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Pending,
    Declined,
    Approved,
    Canceled,
    Credit,
    Processed,
}

/// Card presentation info shown alongside card activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub card_id: CardId,
    pub last_four: String,
}

/// How the payment was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub authorization_method: AuthorizationMethod,
    pub payment_type: PaymentType,
    pub foreign: bool,
}

/// Event-specific payload of an activity row.
///
/// A tagged union instead of a flat struct of nullable columns: which fields
/// belong together is explicit and exhaustively checkable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityDetails {
    /// Deposit/withdrawal against the linked bank account.
    BankTransfer {
        bank_name: String,
        last_four: String,
    },
    /// The counterparty allocation of a reallocation.
    Reallocation { flip_allocation_id: AllocationId },
    /// A card event that was accepted (hold, capture, refund).
    Card {
        merchant: Merchant,
        card: CardDetails,
        payment: Option<PaymentDetails>,
    },
    /// A card event that was declined; reasons are kept for audit even after
    /// the row is hidden from users.
    CardDecline {
        merchant: Merchant,
        card: CardDetails,
        reasons: Vec<DeclineReason>,
    },
    /// Operator-initiated adjustment with free-form notes.
    Manual { notes: String },
}

/// One customer-visible event, written once by the operation that caused it.
///
/// `hide_after`/`visible_after` bound user visibility without deleting
/// anything; auditors read rows regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountActivity {
    pub id: ActivityId,
    pub business_id: BusinessId,
    pub allocation_id: AllocationId,
    pub account_id: AccountId,
    pub adjustment_id: Option<AdjustmentId>,
    pub hold_id: Option<HoldId>,
    pub activity_type: ActivityType,
    pub status: ActivityStatus,
    /// The amount that affected (or would have affected) the balance.
    pub amount: Amount,
    /// The amount the network asked for, before padding/partial approval.
    pub requested_amount: Amount,
    pub activity_time: DateTime<Utc>,
    pub hide_after: Option<DateTime<Utc>>,
    pub visible_after: Option<DateTime<Utc>>,
    pub details: ActivityDetails,
    pub version: u64,
}

impl AccountActivity {
    /// Whether the row should appear to users at `now`.
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        if let Some(hide_after) = self.hide_after {
            if hide_after <= now {
                return false;
            }
        }
        if let Some(visible_after) = self.visible_after {
            if visible_after > now {
                return false;
            }
        }
        true
    }
}

impl Entity for AccountActivity {
    type Id = ActivityId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
