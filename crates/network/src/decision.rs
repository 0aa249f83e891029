//! Pure decisions of the network-message state machine.
//!
//! Each function looks at current state and returns what should happen as a
//! value; the processor executes it transactionally. Declines carry every
//! reason found, and a decline never has money-bearing side effects.

use chrono::{DateTime, Utc};

use tally_accounts::Hold;
use tally_core::{AdjustmentId, Amount, DomainResult, HoldId};

use crate::decline::DeclineReason;
use crate::limits::LimitViolation;
use crate::message::{CardStatus, CreditOrDebit};
use crate::padding::HoldPlan;

/// State consulted when authorizing a pre-auth.
#[derive(Debug, Clone)]
pub struct AuthorizationInput {
    pub card_status: CardStatus,
    /// The account's current available balance.
    pub available: Amount,
    pub plan: HoldPlan,
}

/// Outcome of a pre-authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Approved {
        /// Negative: the amount the hold will reserve.
        hold_amount: Amount,
        expires_at: DateTime<Utc>,
    },
    Declined {
        reasons: Vec<DeclineReason>,
    },
}

/// Decide a pre-authorization.
///
/// Checks run in order: card must be active and the account must have any
/// money at all; then the padded amount must fit the available balance
/// (shrunk to fit when the plan allows partial approval); finally the
/// approved amount is checked against transaction limits via `check_limits`.
pub fn authorize<F>(input: &AuthorizationInput, check_limits: F) -> DomainResult<AuthorizationDecision>
where
    F: FnOnce(&Amount) -> Result<(), LimitViolation>,
{
    let mut reasons = Vec::new();

    if input.card_status != CardStatus::Active {
        reasons.push(DeclineReason::InvalidCardStatus);
    }
    if !input.available.is_positive() {
        reasons.push(DeclineReason::InsufficientFunds);
    }
    if !reasons.is_empty() {
        return Ok(AuthorizationDecision::Declined { reasons });
    }

    let approved = if input.plan.allow_partial_approval {
        // Shrink to what the account can cover.
        Amount::min_of(&input.available, &input.plan.amount.abs())?.negate()
    } else {
        if input.available.add(&input.plan.amount)?.is_negative() {
            return Ok(AuthorizationDecision::Declined {
                reasons: vec![DeclineReason::InsufficientFunds],
            });
        }
        input.plan.amount
    };

    if let Err(violation) = check_limits(&approved) {
        return Ok(AuthorizationDecision::Declined {
            reasons: vec![violation.into()],
        });
    }

    Ok(AuthorizationDecision::Approved {
        hold_amount: approved,
        expires_at: input.plan.expires_at,
    })
}

/// How a financial authorization (capture) should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureClassification {
    /// Credit direction: money moves to the account (merchant refund).
    Refund,
    /// A network adjustment was already posted for this group.
    DuplicateCapture,
    /// Consume the placed hold, then post.
    CaptureHold(HoldId),
    /// No prior hold exists ("forced post"): post without a capture step.
    ForcedPost,
}

/// Classify a capture against the group's prior state.
///
/// `group_captured` is whether any prior message in the group already links
/// a capture adjustment — at most one NETWORK adjustment may ever be posted
/// from a capture path per group, even on duplicate delivery.
pub fn classify_capture(
    direction: CreditOrDebit,
    prior_hold: Option<&Hold>,
    group_captured: bool,
) -> CaptureClassification {
    if direction == CreditOrDebit::Credit {
        return CaptureClassification::Refund;
    }
    if group_captured {
        return CaptureClassification::DuplicateCapture;
    }
    match prior_hold {
        Some(hold) if hold.is_placed() => CaptureClassification::CaptureHold(hold.id),
        _ => CaptureClassification::ForcedPost,
    }
}

/// How a reversal should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReversalClassification {
    /// Authorization not yet captured: free the reservation.
    ReleaseHold(HoldId),
    /// Already captured: reverse the posted adjustment's journal entry.
    ReverseAdjustment(AdjustmentId),
    /// Nothing to undo (late, duplicate, or out-of-order delivery).
    Acknowledge,
}

pub fn classify_reversal(
    prior_hold: Option<&Hold>,
    prior_adjustment: Option<AdjustmentId>,
) -> ReversalClassification {
    if let Some(hold) = prior_hold {
        if hold.is_placed() {
            return ReversalClassification::ReleaseHold(hold.id);
        }
    }
    if let Some(adjustment_id) = prior_adjustment {
        return ReversalClassification::ReverseAdjustment(adjustment_id);
    }
    ReversalClassification::Acknowledge
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tally_accounts::HoldStatus;
    use tally_core::{AccountId, BusinessId, Currency};

    fn usd(units: i64) -> Amount {
        Amount::new(Currency::Usd, units)
    }

    fn plan(units: i64, partial: bool) -> HoldPlan {
        HoldPlan {
            amount: usd(units),
            expires_at: Utc::now() + Duration::days(5),
            allow_partial_approval: partial,
        }
    }

    fn no_limits(_: &Amount) -> Result<(), LimitViolation> {
        Ok(())
    }

    #[test]
    fn approves_when_funds_cover_the_hold() {
        let input = AuthorizationInput {
            card_status: CardStatus::Active,
            available: usd(100_00),
            plan: plan(-30_00, true),
        };
        let decision = authorize(&input, no_limits).unwrap();
        assert_eq!(
            decision,
            AuthorizationDecision::Approved {
                hold_amount: usd(-30_00),
                expires_at: input.plan.expires_at,
            }
        );
    }

    #[test]
    fn declines_insufficient_available_balance() {
        let input = AuthorizationInput {
            card_status: CardStatus::Active,
            available: usd(200_00),
            plan: plan(-250_00, false),
        };
        let decision = authorize(&input, no_limits).unwrap();
        assert_eq!(
            decision,
            AuthorizationDecision::Declined {
                reasons: vec![DeclineReason::InsufficientFunds],
            }
        );
    }

    #[test]
    fn partial_approval_shrinks_to_available() {
        let input = AuthorizationInput {
            card_status: CardStatus::Active,
            available: usd(40_00),
            plan: plan(-60_00, true),
        };
        match authorize(&input, no_limits).unwrap() {
            AuthorizationDecision::Approved { hold_amount, .. } => {
                assert_eq!(hold_amount, usd(-40_00));
            }
            other => panic!("expected approval, got {other:?}"),
        }
    }

    #[test]
    fn inactive_card_and_empty_account_both_reported() {
        let input = AuthorizationInput {
            card_status: CardStatus::Frozen,
            available: usd(0),
            plan: plan(-10_00, true),
        };
        match authorize(&input, no_limits).unwrap() {
            AuthorizationDecision::Declined { reasons } => {
                assert_eq!(
                    reasons,
                    vec![DeclineReason::InvalidCardStatus, DeclineReason::InsufficientFunds]
                );
            }
            other => panic!("expected decline, got {other:?}"),
        }
    }

    #[test]
    fn limit_violation_declines_after_balance_checks() {
        let input = AuthorizationInput {
            card_status: CardStatus::Active,
            available: usd(100_00),
            plan: plan(-30_00, true),
        };
        let decision = authorize(&input, |_| Err(LimitViolation::ForeignBlocked)).unwrap();
        assert_eq!(
            decision,
            AuthorizationDecision::Declined {
                reasons: vec![DeclineReason::ForeignBlocked],
            }
        );
    }

    fn hold(status: HoldStatus) -> Hold {
        let mut h = Hold::place(
            BusinessId::new(),
            AccountId::new(),
            usd(-30_00),
            Utc::now() + Duration::days(5),
            Utc::now(),
        );
        match status {
            HoldStatus::Placed => {}
            HoldStatus::Released => h.release().unwrap(),
            HoldStatus::Captured => h.capture(usd(-30_00)).unwrap(),
        }
        h
    }

    #[test]
    fn capture_consumes_placed_hold() {
        let h = hold(HoldStatus::Placed);
        assert_eq!(
            classify_capture(CreditOrDebit::Debit, Some(&h), false),
            CaptureClassification::CaptureHold(h.id)
        );
    }

    #[test]
    fn capture_without_hold_is_forced_post() {
        assert_eq!(
            classify_capture(CreditOrDebit::Debit, None, false),
            CaptureClassification::ForcedPost
        );
        let released = hold(HoldStatus::Released);
        assert_eq!(
            classify_capture(CreditOrDebit::Debit, Some(&released), false),
            CaptureClassification::ForcedPost
        );
    }

    #[test]
    fn second_capture_for_group_is_duplicate() {
        let h = hold(HoldStatus::Placed);
        assert_eq!(
            classify_capture(CreditOrDebit::Debit, Some(&h), true),
            CaptureClassification::DuplicateCapture
        );
    }

    #[test]
    fn credit_direction_is_refund() {
        assert_eq!(
            classify_capture(CreditOrDebit::Credit, None, true),
            CaptureClassification::Refund
        );
    }

    #[test]
    fn reversal_prefers_releasing_a_placed_hold() {
        let h = hold(HoldStatus::Placed);
        let adjustment = AdjustmentId::new();
        assert_eq!(
            classify_reversal(Some(&h), Some(adjustment)),
            ReversalClassification::ReleaseHold(h.id)
        );
    }

    #[test]
    fn reversal_after_capture_reverses_the_adjustment() {
        let h = hold(HoldStatus::Captured);
        let adjustment = AdjustmentId::new();
        assert_eq!(
            classify_reversal(Some(&h), Some(adjustment)),
            ReversalClassification::ReverseAdjustment(adjustment)
        );
    }

    #[test]
    fn reversal_with_nothing_to_undo_is_acknowledged() {
        assert_eq!(classify_reversal(None, None), ReversalClassification::Acknowledge);
    }

    proptest::proptest! {
        /// An approval never reserves more than the account has available.
        #[test]
        fn approval_never_exceeds_available(
            available in 1i64..1_000_000,
            requested in 1i64..1_000_000,
        ) {
            let input = AuthorizationInput {
                card_status: CardStatus::Active,
                available: usd(available),
                plan: plan(-requested, true),
            };
            match authorize(&input, no_limits).unwrap() {
                AuthorizationDecision::Approved { hold_amount, .. } => {
                    proptest::prop_assert!(hold_amount.abs().units() <= available);
                    proptest::prop_assert!(hold_amount.is_negative());
                }
                AuthorizationDecision::Declined { .. } => {}
            }
        }
    }
}
