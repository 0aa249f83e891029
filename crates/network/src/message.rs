use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{
    AccountId, AdjustmentId, AllocationId, Amount, CardId, Entity, HoldId, MessageGroupId,
    NetworkMessageId,
};

use crate::decline::DeclineReason;
use crate::limits::AuthorizationMethod;
use crate::merchant::Merchant;

/// Inbound network event kinds.
///
/// Advice variants report a decision the network already made; the processor
/// must tolerate an advice arriving before (or instead of) its primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMessageType {
    PreAuth,
    PreAuthAdvice,
    FinancialAuth,
    FinancialAuthAdvice,
    Reversal,
    ReversalAdvice,
}

/// Primary classification of a message type, advice or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageClass {
    PreAuth,
    FinancialAuth,
    Reversal,
}

impl NetworkMessageType {
    pub fn is_advice(&self) -> bool {
        matches!(
            self,
            NetworkMessageType::PreAuthAdvice
                | NetworkMessageType::FinancialAuthAdvice
                | NetworkMessageType::ReversalAdvice
        )
    }

    pub fn class(&self) -> MessageClass {
        match self {
            NetworkMessageType::PreAuth | NetworkMessageType::PreAuthAdvice => MessageClass::PreAuth,
            NetworkMessageType::FinancialAuth | NetworkMessageType::FinancialAuthAdvice => {
                MessageClass::FinancialAuth
            }
            NetworkMessageType::Reversal | NetworkMessageType::ReversalAdvice => {
                MessageClass::Reversal
            }
        }
    }
}

/// Direction of money movement from the account's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditOrDebit {
    Credit,
    Debit,
}

/// Card state as reported by the issuing processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Active,
    Frozen,
    Canceled,
}

/// One inbound card-network event, already normalized by the network client.
///
/// `external_ref` uniquely identifies this delivery; `auth_ref` is shared by
/// every message of one card-transaction lifecycle and drives group
/// correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub message_type: NetworkMessageType,
    pub card_id: CardId,
    pub card_status: CardStatus,
    pub card_last_four: String,
    pub external_ref: String,
    pub auth_ref: String,
    pub direction: CreditOrDebit,
    /// Positive magnitude; direction carries the sign.
    pub amount: Amount,
    pub merchant: Merchant,
    pub authorization_method: Option<AuthorizationMethod>,
    pub foreign: bool,
    /// Whether the network supports approving less than the requested
    /// amount for this authorization.
    pub partial_approval_allowed: bool,
    pub occurred_at: DateTime<Utc>,
}

impl NetworkRequest {
    /// The signed amount from the account's point of view.
    pub fn signed_amount(&self) -> Amount {
        match self.direction {
            CreditOrDebit::Credit => self.amount,
            CreditOrDebit::Debit => self.amount.negate(),
        }
    }
}

/// Append-only audit row for one processed network event.
///
/// One-to-zero-or-one with a hold and/or an adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMessage {
    pub id: NetworkMessageId,
    pub group_id: MessageGroupId,
    pub message_type: NetworkMessageType,
    pub card_id: CardId,
    pub account_id: AccountId,
    pub allocation_id: AllocationId,
    pub hold_id: Option<HoldId>,
    pub adjustment_id: Option<AdjustmentId>,
    pub amount: Amount,
    pub merchant: Merchant,
    pub external_ref: String,
    pub auth_ref: String,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Entity for NetworkMessage {
    type Id = NetworkMessageId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Acknowledgement returned to the network client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAck {
    pub message_id: Option<NetworkMessageId>,
    pub outcome: AckOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AckOutcome {
    /// Authorization accepted; a hold reserves `amount`.
    Approved { amount: Amount },
    /// Authorization rejected with structured reasons.
    Declined { reasons: Vec<DeclineReason> },
    /// Money-bearing message applied (capture, refund, reversal).
    Processed,
    /// Already seen (same external reference); nothing re-applied.
    Duplicate,
}

impl NetworkAck {
    pub fn duplicate() -> Self {
        Self {
            message_id: None,
            outcome: AckOutcome::Duplicate,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self.outcome, AckOutcome::Approved { .. })
    }
}
