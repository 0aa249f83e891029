use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use tally_accounts::{Account, Hold};
use tally_activity::{ActivityStatus, ActivityType};
use tally_core::{
    AdjustmentId, DomainResult, HoldId, MessageGroupId, NetworkMessageId,
};
use tally_network::{
    AckOutcome, AuthorizationDecision, AuthorizationInput, CaptureClassification, DeclineReason,
    MessageClass, NetworkAck, NetworkMessage, NetworkRequest, ReversalClassification, authorize,
    classify_capture, classify_reversal, plan_authorization_hold,
};

use crate::services::activity::ActivityService;
use crate::services::adjustments::AdjustmentService;
use crate::services::holds::HoldService;
use crate::services::limits::TransactionLimitService;
use crate::store::Txn;

/// Hold/adjustment links to stamp on the audit row.
#[derive(Debug, Default, Clone, Copy)]
struct MessageLinks {
    hold_id: Option<HoldId>,
    adjustment_id: Option<AdjustmentId>,
}

/// Turns inbound authorization/capture/reversal events into holds and
/// adjustments, appends the audit trail, and returns the acknowledgement.
///
/// Declines never touch the ledger engine; duplicates are acknowledged
/// without re-processing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkMessageService {
    holds: HoldService,
    adjustments: AdjustmentService,
    activity: ActivityService,
    limits: TransactionLimitService,
}

impl NetworkMessageService {
    pub fn process(
        &self,
        txn: &mut Txn,
        request: &NetworkRequest,
        now: DateTime<Utc>,
    ) -> DomainResult<NetworkAck> {
        request.amount.ensure_positive()?;

        // Idempotent by construction: a redelivery of the same message is
        // acknowledged without re-processing and without a second audit row.
        if txn
            .message_by_external_ref(&request.external_ref, request.message_type)
            .is_some()
        {
            info!(external_ref = %request.external_ref, "duplicate network message acknowledged");
            return Ok(NetworkAck::duplicate());
        }

        // The card may belong to someone else's program; without an account
        // there is nothing to attribute the event to.
        let Some(account) = txn.account_by_card(request.card_id) else {
            warn!(card = %request.card_id, "network message for unknown card");
            return Ok(NetworkAck {
                message_id: None,
                outcome: AckOutcome::Declined {
                    reasons: vec![DeclineReason::CardNotFound],
                },
            });
        };

        // Adopt the lifecycle's group, or start one.
        let group_id = txn
            .earliest_message_by_auth_ref(&request.auth_ref)
            .map(|m| m.group_id)
            .unwrap_or_else(MessageGroupId::new);
        let prior_messages = txn.messages_in_group(group_id);

        let prior_hold: Option<Hold> = prior_messages
            .iter()
            .filter_map(|m| m.hold_id)
            .filter_map(|id| txn.hold(id).ok())
            .filter(|h| h.is_placed())
            .max_by_key(|h| (h.created_at, h.id));

        let capture_adjustment: Option<AdjustmentId> = prior_messages
            .iter()
            .filter(|m| m.message_type.class() == MessageClass::FinancialAuth)
            .find_map(|m| m.adjustment_id);

        let mut links = MessageLinks::default();
        let outcome = match request.message_type.class() {
            MessageClass::PreAuth => {
                self.process_pre_auth(txn, &account, request, prior_hold.as_ref(), &mut links, now)?
            }
            MessageClass::FinancialAuth => self.process_financial_auth(
                txn,
                &account,
                request,
                prior_hold.as_ref(),
                capture_adjustment,
                &mut links,
                now,
            )?,
            MessageClass::Reversal => self.process_reversal(
                txn,
                &account,
                request,
                prior_hold.as_ref(),
                capture_adjustment,
                &mut links,
                now,
            )?,
        };

        let message = NetworkMessage {
            id: NetworkMessageId::new(),
            group_id,
            message_type: request.message_type,
            card_id: request.card_id,
            account_id: account.id,
            allocation_id: account.allocation_id,
            hold_id: links.hold_id,
            adjustment_id: links.adjustment_id,
            amount: request.signed_amount(),
            merchant: request.merchant.clone(),
            external_ref: request.external_ref.clone(),
            auth_ref: request.auth_ref.clone(),
            created_at: now,
            version: 0,
        };
        txn.insert_network_message(message.clone())?;
        debug!(message = %message.id, group = %group_id, "network message recorded");

        Ok(NetworkAck {
            message_id: Some(message.id),
            outcome,
        })
    }

    fn process_pre_auth(
        &self,
        txn: &mut Txn,
        account: &Account,
        request: &NetworkRequest,
        prior_hold: Option<&Hold>,
        links: &mut MessageLinks,
        now: DateTime<Utc>,
    ) -> DomainResult<AckOutcome> {
        // Incremental authorization: the network re-authorizes the whole
        // amount, so the superseded hold is freed before deciding.
        if let Some(prior) = prior_hold {
            self.holds.release(txn, prior.id)?;
            self.activity.hide_for_hold(txn, prior.id, now)?;
        }

        let requested = request.amount.negate();
        let plan = plan_authorization_hold(
            &requested,
            request.merchant.merchant_type,
            request.partial_approval_allowed,
            now,
        )?;

        let available = account.available_balance(&txn.placed_holds_for_account(account.id))?;
        let input = AuthorizationInput {
            card_status: request.card_status,
            available,
            plan: plan.clone(),
        };

        let decision = authorize(&input, |approved| {
            self.limits.check(
                txn,
                account.business_id,
                account.allocation_id,
                request.card_id,
                approved,
                request.merchant.category_code,
                request.authorization_method,
                request.foreign,
                now,
            )
        })?;

        match decision {
            AuthorizationDecision::Approved {
                hold_amount,
                expires_at,
            } => {
                let hold = self.holds.place(txn, account, hold_amount, expires_at, now)?;
                links.hold_id = Some(hold.id);
                self.activity.record_network_hold(txn, account, request, &hold)?;
                debug!(
                    hold = %hold.id,
                    amount = %hold_amount,
                    "authorization approved"
                );
                Ok(AckOutcome::Approved {
                    amount: hold_amount.negate(),
                })
            }
            AuthorizationDecision::Declined { reasons } => {
                self.activity.record_network_decline(
                    txn,
                    account,
                    request,
                    plan.amount,
                    reasons.clone(),
                    now,
                )?;
                warn!(
                    account = %account.id,
                    amount = %plan.amount,
                    ?reasons,
                    "authorization declined"
                );
                Ok(AckOutcome::Declined { reasons })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_financial_auth(
        &self,
        txn: &mut Txn,
        account: &Account,
        request: &NetworkRequest,
        prior_hold: Option<&Hold>,
        capture_adjustment: Option<AdjustmentId>,
        links: &mut MessageLinks,
        now: DateTime<Utc>,
    ) -> DomainResult<AckOutcome> {
        let settled = request.signed_amount();

        match classify_capture(request.direction, prior_hold, capture_adjustment.is_some()) {
            CaptureClassification::Refund => {
                let adjustment = self.adjustments.record_network(txn, account, settled, now)?;
                links.adjustment_id = Some(adjustment.id);
                self.activity.record_network_adjustment(
                    txn,
                    account,
                    request,
                    &adjustment,
                    ActivityType::NetworkRefund,
                    ActivityStatus::Processed,
                )?;
                Ok(AckOutcome::Processed)
            }
            CaptureClassification::DuplicateCapture => {
                warn!(auth_ref = %request.auth_ref, "capture already posted for group");
                Ok(AckOutcome::Duplicate)
            }
            CaptureClassification::CaptureHold(hold_id) => {
                let hold = self.holds.capture(txn, hold_id, settled)?;
                links.hold_id = Some(hold.id);
                // The pending authorization row is superseded by the capture.
                self.activity.hide_for_hold(txn, hold_id, now)?;

                let adjustment = self.adjustments.record_network(txn, account, settled, now)?;
                links.adjustment_id = Some(adjustment.id);
                self.activity.record_network_adjustment(
                    txn,
                    account,
                    request,
                    &adjustment,
                    ActivityType::NetworkCapture,
                    ActivityStatus::Approved,
                )?;
                Ok(AckOutcome::Processed)
            }
            CaptureClassification::ForcedPost => {
                // No prior hold: post directly, no capture step.
                let adjustment = self.adjustments.record_network(txn, account, settled, now)?;
                links.adjustment_id = Some(adjustment.id);
                self.activity.record_network_adjustment(
                    txn,
                    account,
                    request,
                    &adjustment,
                    ActivityType::NetworkCapture,
                    ActivityStatus::Approved,
                )?;
                Ok(AckOutcome::Processed)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_reversal(
        &self,
        txn: &mut Txn,
        account: &Account,
        request: &NetworkRequest,
        prior_hold: Option<&Hold>,
        capture_adjustment: Option<AdjustmentId>,
        links: &mut MessageLinks,
        now: DateTime<Utc>,
    ) -> DomainResult<AckOutcome> {
        match classify_reversal(prior_hold, capture_adjustment) {
            ReversalClassification::ReleaseHold(hold_id) => {
                let released = self.holds.release(txn, hold_id)?;
                self.activity.hide_for_hold(txn, hold_id, now)?;
                if let Some(hold) = released {
                    links.hold_id = Some(hold.id);
                    self.activity
                        .record_hold_canceled(txn, account, request, &hold, now)?;
                }
                Ok(AckOutcome::Processed)
            }
            ReversalClassification::ReverseAdjustment(adjustment_id) => {
                let inverse = self
                    .adjustments
                    .reverse_network_adjustment(txn, adjustment_id, now)?;
                links.adjustment_id = Some(inverse.id);
                let status = if inverse.amount.is_positive() {
                    ActivityStatus::Credit
                } else {
                    ActivityStatus::Processed
                };
                self.activity.record_network_adjustment(
                    txn,
                    account,
                    request,
                    &inverse,
                    ActivityType::NetworkRefund,
                    status,
                )?;
                Ok(AckOutcome::Processed)
            }
            ReversalClassification::Acknowledge => {
                info!(auth_ref = %request.auth_ref, "reversal with nothing to undo");
                Ok(AckOutcome::Processed)
            }
        }
    }
}
