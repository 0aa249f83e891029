//! `tally-network` — card-network message model and state-machine decisions.
//!
//! Everything here is pure: inbound events are already-normalized data, and
//! the authorize/capture/reversal classification functions return decisions
//! as values. Executing a decision (holds, postings, activity rows) is the
//! processor's job in the infrastructure layer.

pub mod decision;
pub mod decline;
pub mod limits;
pub mod merchant;
pub mod message;
pub mod padding;

pub use decision::{
    AuthorizationDecision, AuthorizationInput, CaptureClassification, ReversalClassification,
    authorize, classify_capture, classify_reversal,
};
pub use decline::DeclineReason;
pub use limits::{
    AuthorizationMethod, LimitCheckContext, LimitOwner, LimitPeriod, LimitViolation, MccGroup,
    PaymentType, TransactionLimit, evaluate_limit,
};
pub use merchant::{Merchant, MerchantType};
pub use message::{
    AckOutcome, CardStatus, CreditOrDebit, MessageClass, NetworkAck, NetworkMessage,
    NetworkMessageType, NetworkRequest,
};
pub use padding::{HoldPlan, plan_authorization_hold};
