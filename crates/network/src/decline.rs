use serde::{Deserialize, Serialize};

use crate::limits::{LimitPeriod, LimitViolation, MccGroup, PaymentType};

/// Structured decline reason returned to the network and retained on the
/// declined activity row for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeclineReason {
    InsufficientFunds,
    InvalidCardStatus,
    CardNotFound,
    LimitExceeded { period: LimitPeriod, cap_units: i64 },
    MccBlocked { group: MccGroup },
    PaymentTypeBlocked { payment_type: PaymentType },
    ForeignBlocked,
}

impl From<LimitViolation> for DeclineReason {
    fn from(violation: LimitViolation) -> Self {
        match violation {
            LimitViolation::LimitExceeded { period, cap_units } => {
                DeclineReason::LimitExceeded { period, cap_units }
            }
            LimitViolation::MccBlocked { group } => DeclineReason::MccBlocked { group },
            LimitViolation::PaymentTypeBlocked { payment_type } => {
                DeclineReason::PaymentTypeBlocked { payment_type }
            }
            LimitViolation::ForeignBlocked => DeclineReason::ForeignBlocked,
        }
    }
}
