//! Orchestrating services.
//!
//! Each service method runs inside a caller-owned transaction (`&mut Txn`);
//! nesting a call joins the ambient unit of work. The `Platform` facade owns
//! begin/commit.

pub mod accounts;
pub mod activity;
pub mod adjustments;
pub mod holds;
pub mod ledger;
pub mod limits;
pub mod network;

pub use accounts::AccountService;
pub use activity::ActivityService;
pub use adjustments::AdjustmentService;
pub use holds::HoldService;
pub use ledger::{LedgerService, PostedEntry};
pub use limits::TransactionLimitService;
pub use network::NetworkMessageService;
