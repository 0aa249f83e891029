//! Transaction limits: per-period purchase caps and spend controls.
//!
//! Limit evaluation is a pure query — it never touches the ledger. The
//! stored-limit lookup and recent-spend aggregation live in the
//! infrastructure layer; this module owns the model and the decision.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tally_core::{AllocationId, Amount, BusinessId, CardId, Entity, TransactionLimitId};

/// Rolling window a purchase cap applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl LimitPeriod {
    pub fn days(&self) -> i64 {
        match self {
            LimitPeriod::Daily => 1,
            LimitPeriod::Weekly => 7,
            LimitPeriod::Monthly => 30,
        }
    }
}

/// Coarse MCC grouping used by spend controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MccGroup {
    Travel,
    Fuel,
    Dining,
    Transport,
    Entertainment,
    Health,
    Utilities,
    Retail,
    Services,
    Other,
}

impl MccGroup {
    pub fn from_mcc(mcc: u16) -> Self {
        match mcc {
            3000..=3999 | 4411 | 4511 | 7011 | 7512 => MccGroup::Travel,
            5541 | 5542 => MccGroup::Fuel,
            5811..=5814 => MccGroup::Dining,
            4111 | 4121 | 4131 => MccGroup::Transport,
            7800..=7999 => MccGroup::Entertainment,
            8000..=8099 => MccGroup::Health,
            4900 => MccGroup::Utilities,
            5200..=5999 => MccGroup::Retail,
            7200..=7799 | 8100..=8999 => MccGroup::Services,
            _ => MccGroup::Other,
        }
    }
}

/// How the cardholder presented the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationMethod {
    Chip,
    Contactless,
    Swipe,
    KeyedIn,
    Online,
}

/// Payment channel derived from the authorization method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Pos,
    Online,
}

impl AuthorizationMethod {
    pub fn payment_type(&self) -> PaymentType {
        match self {
            AuthorizationMethod::Online => PaymentType::Online,
            _ => PaymentType::Pos,
        }
    }
}

/// Who a limit record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "owner", rename_all = "snake_case")]
pub enum LimitOwner {
    Allocation { allocation_id: AllocationId },
    Card { card_id: CardId },
}

/// Spend-control record for one allocation or card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLimit {
    pub id: TransactionLimitId,
    pub business_id: BusinessId,
    pub owner: LimitOwner,
    /// Purchase caps in minor units per rolling window.
    pub purchase_limits: BTreeMap<LimitPeriod, i64>,
    pub disabled_mcc_groups: BTreeSet<MccGroup>,
    pub disabled_payment_types: BTreeSet<PaymentType>,
    pub disable_foreign: bool,
    pub version: u64,
}

impl TransactionLimit {
    pub fn new(business_id: BusinessId, owner: LimitOwner) -> Self {
        Self {
            id: TransactionLimitId::new(),
            business_id,
            owner,
            purchase_limits: BTreeMap::new(),
            disabled_mcc_groups: BTreeSet::new(),
            disabled_payment_types: BTreeSet::new(),
            disable_foreign: false,
            version: 0,
        }
    }

    pub fn with_purchase_limit(mut self, period: LimitPeriod, cap_units: i64) -> Self {
        self.purchase_limits.insert(period, cap_units);
        self
    }
}

impl Entity for TransactionLimit {
    type Id = TransactionLimitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Why a limit check failed. Feeds decline reasons, not `DomainError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum LimitViolation {
    LimitExceeded { period: LimitPeriod, cap_units: i64 },
    MccBlocked { group: MccGroup },
    PaymentTypeBlocked { payment_type: PaymentType },
    ForeignBlocked,
}

/// Inputs to one limit evaluation.
#[derive(Debug, Clone)]
pub struct LimitCheckContext {
    /// Negative: the amount about to be approved.
    pub amount: Amount,
    pub mcc_group: MccGroup,
    pub payment_type: Option<PaymentType>,
    pub foreign: bool,
    pub today: NaiveDate,
}

/// Evaluate one limit record against recent spend.
///
/// `spend_by_day` holds negative daily purchase totals (minor units) for the
/// limit owner. For each configured cap: take the spend inside the rolling
/// window, add the prospective amount, and fail if the cap is exhausted.
pub fn evaluate_limit(
    limit: &TransactionLimit,
    spend_by_day: &BTreeMap<NaiveDate, i64>,
    ctx: &LimitCheckContext,
) -> Result<(), LimitViolation> {
    if limit.disabled_mcc_groups.contains(&ctx.mcc_group) {
        return Err(LimitViolation::MccBlocked { group: ctx.mcc_group });
    }

    if let Some(payment_type) = ctx.payment_type {
        if limit.disabled_payment_types.contains(&payment_type) {
            return Err(LimitViolation::PaymentTypeBlocked { payment_type });
        }
    }

    if limit.disable_foreign && ctx.foreign {
        return Err(LimitViolation::ForeignBlocked);
    }

    if !ctx.amount.is_negative() {
        return Ok(());
    }

    for (&period, &cap_units) in &limit.purchase_limits {
        let window_start = ctx.today - chrono::Duration::days(period.days());
        let usage: i64 = spend_by_day
            .iter()
            .filter(|(day, _)| **day > window_start)
            .map(|(_, units)| *units)
            .sum();

        // cap + prospective amount + usage, all spend negative.
        let remaining = cap_units + ctx.amount.units() + usage;
        if remaining < 0 {
            return Err(LimitViolation::LimitExceeded { period, cap_units });
        }
    }

    Ok(())
}
