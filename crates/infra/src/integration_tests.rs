//! End-to-end scenarios over the platform facade and the in-memory store.

use chrono::{Duration, Utc};

use tally_accounts::{Account, HoldStatus};
use tally_activity::{ActivityFilter, ActivityStatus, ActivityType};
use tally_core::{AllocationId, Amount, BusinessId, CardId, Currency, DomainError};
use tally_ledger::{JournalEntrySpec, LedgerAccountType};
use tally_network::{
    AckOutcome, AuthorizationMethod, CardStatus, CreditOrDebit, DeclineReason, LimitOwner,
    LimitPeriod, Merchant, NetworkMessageType, NetworkRequest, TransactionLimit,
};

use crate::platform::Platform;
use crate::services::{AccountService, LedgerService};
use crate::store::InMemoryStore;

fn usd(units: i64) -> Amount {
    Amount::new(Currency::Usd, units)
}

struct Fixture {
    platform: Platform,
    business: BusinessId,
    card: CardId,
    account: Account,
}

/// Allocation account funded with $100.00, with one card linked to it.
fn funded_fixture(initial_units: i64) -> Fixture {
    let platform = Platform::new();
    let business = BusinessId::new();
    let allocation = AllocationId::new();
    let card = CardId::new();

    let account = platform
        .create_allocation_account(business, allocation, Currency::Usd)
        .unwrap();
    let account = platform.register_card(card, account.id).unwrap();

    if initial_units > 0 {
        platform
            .deposit_funds(account.id, usd(initial_units), false, "First Bank", "1234")
            .unwrap();
    }

    Fixture {
        platform,
        business,
        card,
        account,
    }
}

fn request(
    card: CardId,
    message_type: NetworkMessageType,
    direction: CreditOrDebit,
    units: i64,
    auth_ref: &str,
    external_ref: &str,
) -> NetworkRequest {
    NetworkRequest {
        message_type,
        card_id: card,
        card_status: CardStatus::Active,
        card_last_four: "4242".to_string(),
        external_ref: external_ref.to_string(),
        auth_ref: auth_ref.to_string(),
        direction,
        amount: usd(units),
        merchant: Merchant::new("COFFEE SHOP", "M-100", 5999, "US"),
        authorization_method: Some(AuthorizationMethod::Chip),
        foreign: false,
        partial_approval_allowed: false,
        occurred_at: Utc::now(),
    }
}

fn pre_auth(card: CardId, units: i64, auth_ref: &str, external_ref: &str) -> NetworkRequest {
    request(
        card,
        NetworkMessageType::PreAuth,
        CreditOrDebit::Debit,
        units,
        auth_ref,
        external_ref,
    )
}

fn capture(card: CardId, units: i64, auth_ref: &str, external_ref: &str) -> NetworkRequest {
    request(
        card,
        NetworkMessageType::FinancialAuth,
        CreditOrDebit::Debit,
        units,
        auth_ref,
        external_ref,
    )
}

fn reversal(card: CardId, units: i64, auth_ref: &str, external_ref: &str) -> NetworkRequest {
    request(
        card,
        NetworkMessageType::Reversal,
        CreditOrDebit::Debit,
        units,
        auth_ref,
        external_ref,
    )
}

fn audit_filter(business: BusinessId) -> ActivityFilter {
    let mut filter = ActivityFilter::for_business(business);
    filter.include_hidden = true;
    filter.page.limit = 100;
    filter
}

#[test]
fn auth_then_capture_settles_the_hold() {
    let f = funded_fixture(100_00);

    let ack = f
        .platform
        .process_network_message(&pre_auth(f.card, 30_00, "txn-1", "msg-1"))
        .unwrap();
    assert_eq!(ack.outcome, AckOutcome::Approved { amount: usd(30_00) });

    let balances = f.platform.account_balances(f.account.id).unwrap();
    assert_eq!(balances.ledger_balance, usd(100_00));
    assert_eq!(balances.available_balance, usd(70_00));

    let ack = f
        .platform
        .process_network_message(&capture(f.card, 30_00, "txn-1", "msg-2"))
        .unwrap();
    assert_eq!(ack.outcome, AckOutcome::Processed);

    let balances = f.platform.account_balances(f.account.id).unwrap();
    assert_eq!(balances.ledger_balance, usd(70_00));
    assert_eq!(balances.available_balance, usd(70_00));

    // The pending authorization row is superseded; the capture row shows.
    let page = f
        .platform
        .find_account_activity(&ActivityFilter::for_business(f.business))
        .unwrap();
    let capture_row = page
        .items
        .iter()
        .find(|a| a.activity_type == ActivityType::NetworkCapture)
        .unwrap();
    assert_eq!(capture_row.status, ActivityStatus::Approved);
    assert_eq!(capture_row.amount, usd(-30_00));
    assert!(
        !page
            .items
            .iter()
            .any(|a| a.activity_type == ActivityType::NetworkAuth
                && a.status == ActivityStatus::Pending)
    );
}

#[test]
fn auth_then_reversal_restores_availability() {
    let f = funded_fixture(100_00);

    f.platform
        .process_network_message(&pre_auth(f.card, 30_00, "txn-1", "msg-1"))
        .unwrap();
    assert_eq!(
        f.platform
            .account_balances(f.account.id)
            .unwrap()
            .available_balance,
        usd(70_00)
    );

    let ack = f
        .platform
        .process_network_message(&reversal(f.card, 30_00, "txn-1", "msg-2"))
        .unwrap();
    assert_eq!(ack.outcome, AckOutcome::Processed);

    let balances = f.platform.account_balances(f.account.id).unwrap();
    assert_eq!(balances.ledger_balance, usd(100_00));
    assert_eq!(balances.available_balance, usd(100_00));

    let page = f
        .platform
        .find_account_activity(&audit_filter(f.business))
        .unwrap();
    assert!(
        page.items
            .iter()
            .any(|a| a.status == ActivityStatus::Canceled)
    );
}

#[test]
fn insufficient_funds_declines_without_side_effects() {
    let f = funded_fixture(200_00);

    let ack = f
        .platform
        .process_network_message(&pre_auth(f.card, 250_00, "txn-1", "msg-1"))
        .unwrap();
    assert_eq!(
        ack.outcome,
        AckOutcome::Declined {
            reasons: vec![DeclineReason::InsufficientFunds]
        }
    );

    let balances = f.platform.account_balances(f.account.id).unwrap();
    assert_eq!(balances.ledger_balance, usd(200_00));
    assert_eq!(balances.available_balance, usd(200_00));

    let mut filter = audit_filter(f.business);
    filter.statuses = Some(vec![ActivityStatus::Declined]);
    let page = f.platform.find_account_activity(&filter).unwrap();
    assert_eq!(page.total, 1);
    assert!(page.items[0].hold_id.is_none());
    assert!(page.items[0].adjustment_id.is_none());
}

#[test]
fn reallocation_moves_funds_atomically() {
    let f = funded_fixture(100_00);
    let other_allocation = AllocationId::new();
    let other = f
        .platform
        .create_allocation_account(f.business, other_allocation, Currency::Usd)
        .unwrap();

    let moved = f
        .platform
        .reallocate_funds(f.account.id, other.id, usd(50_00))
        .unwrap();
    assert_eq!(moved.from_adjustment.amount, usd(-50_00));
    assert_eq!(moved.to_adjustment.amount, usd(50_00));

    assert_eq!(
        f.platform
            .account_balances(f.account.id)
            .unwrap()
            .ledger_balance,
        usd(50_00)
    );
    assert_eq!(
        f.platform.account_balances(other.id).unwrap().ledger_balance,
        usd(50_00)
    );

    let mut filter = audit_filter(f.business);
    filter.types = Some(vec![ActivityType::Reallocate]);
    let page = f.platform.find_account_activity(&filter).unwrap();
    assert_eq!(page.total, 2);
}

#[test]
fn duplicate_delivery_is_acknowledged_without_reprocessing() {
    let f = funded_fixture(100_00);

    let first = f
        .platform
        .process_network_message(&pre_auth(f.card, 30_00, "txn-1", "msg-1"))
        .unwrap();
    assert!(first.is_approved());

    let second = f
        .platform
        .process_network_message(&pre_auth(f.card, 30_00, "txn-1", "msg-1"))
        .unwrap();
    assert_eq!(second.outcome, AckOutcome::Duplicate);

    // Only one hold reserved.
    assert_eq!(
        f.platform
            .account_balances(f.account.id)
            .unwrap()
            .available_balance,
        usd(70_00)
    );
}

#[test]
fn capture_delivered_twice_posts_one_adjustment() {
    let f = funded_fixture(100_00);

    f.platform
        .process_network_message(&pre_auth(f.card, 30_00, "txn-1", "msg-1"))
        .unwrap();
    f.platform
        .process_network_message(&capture(f.card, 30_00, "txn-1", "msg-2"))
        .unwrap();

    // Redelivery under a fresh external reference still may not post twice.
    let ack = f
        .platform
        .process_network_message(&capture(f.card, 30_00, "txn-1", "msg-3"))
        .unwrap();
    assert_eq!(ack.outcome, AckOutcome::Duplicate);

    let balances = f.platform.account_balances(f.account.id).unwrap();
    assert_eq!(balances.ledger_balance, usd(70_00));

    let mut filter = audit_filter(f.business);
    filter.types = Some(vec![ActivityType::NetworkCapture]);
    let page = f.platform.find_account_activity(&filter).unwrap();
    assert_eq!(page.total, 1);
}

#[test]
fn forced_post_settles_without_prior_hold() {
    let f = funded_fixture(100_00);

    // Advice arrives with no primary ever seen.
    let ack = f
        .platform
        .process_network_message(&request(
            f.card,
            NetworkMessageType::FinancialAuthAdvice,
            CreditOrDebit::Debit,
            25_00,
            "txn-9",
            "msg-1",
        ))
        .unwrap();
    assert_eq!(ack.outcome, AckOutcome::Processed);

    let balances = f.platform.account_balances(f.account.id).unwrap();
    assert_eq!(balances.ledger_balance, usd(75_00));
    assert_eq!(balances.available_balance, usd(75_00));
}

#[test]
fn reversal_after_capture_posts_the_inverse() {
    let f = funded_fixture(100_00);

    f.platform
        .process_network_message(&pre_auth(f.card, 30_00, "txn-1", "msg-1"))
        .unwrap();
    f.platform
        .process_network_message(&capture(f.card, 30_00, "txn-1", "msg-2"))
        .unwrap();
    assert_eq!(
        f.platform
            .account_balances(f.account.id)
            .unwrap()
            .ledger_balance,
        usd(70_00)
    );

    let ack = f
        .platform
        .process_network_message(&reversal(f.card, 30_00, "txn-1", "msg-3"))
        .unwrap();
    assert_eq!(ack.outcome, AckOutcome::Processed);

    let balances = f.platform.account_balances(f.account.id).unwrap();
    assert_eq!(balances.ledger_balance, usd(100_00));

    let mut filter = audit_filter(f.business);
    filter.statuses = Some(vec![ActivityStatus::Credit]);
    let page = f.platform.find_account_activity(&filter).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].amount, usd(30_00));
}

#[test]
fn merchant_refund_credits_the_account() {
    let f = funded_fixture(100_00);

    let ack = f
        .platform
        .process_network_message(&request(
            f.card,
            NetworkMessageType::FinancialAuth,
            CreditOrDebit::Credit,
            10_00,
            "txn-r",
            "msg-1",
        ))
        .unwrap();
    assert_eq!(ack.outcome, AckOutcome::Processed);

    assert_eq!(
        f.platform
            .account_balances(f.account.id)
            .unwrap()
            .ledger_balance,
        usd(110_00)
    );

    let mut filter = audit_filter(f.business);
    filter.types = Some(vec![ActivityType::NetworkRefund]);
    let page = f.platform.find_account_activity(&filter).unwrap();
    assert_eq!(page.total, 1);
}

#[test]
fn restaurant_authorizations_are_padded() {
    let f = funded_fixture(100_00);

    let mut req = pre_auth(f.card, 50_00, "txn-1", "msg-1");
    req.merchant = Merchant::new("DINER", "M-7", 5812, "US");

    let ack = f.platform.process_network_message(&req).unwrap();
    assert_eq!(ack.outcome, AckOutcome::Approved { amount: usd(60_00) });
    assert_eq!(
        f.platform
            .account_balances(f.account.id)
            .unwrap()
            .available_balance,
        usd(40_00)
    );
}

#[test]
fn partial_capture_frees_the_remainder() {
    let f = funded_fixture(100_00);

    f.platform
        .process_network_message(&pre_auth(f.card, 60_00, "txn-1", "msg-1"))
        .unwrap();
    assert_eq!(
        f.platform
            .account_balances(f.account.id)
            .unwrap()
            .available_balance,
        usd(40_00)
    );

    // Settles for less than the reservation.
    f.platform
        .process_network_message(&capture(f.card, 45_00, "txn-1", "msg-2"))
        .unwrap();

    let balances = f.platform.account_balances(f.account.id).unwrap();
    assert_eq!(balances.ledger_balance, usd(55_00));
    assert_eq!(balances.available_balance, usd(55_00));
}

#[test]
fn daily_purchase_limit_declines_over_cap() {
    let f = funded_fixture(500_00);

    f.platform
        .upsert_transaction_limit(
            TransactionLimit::new(f.business, LimitOwner::Card { card_id: f.card })
                .with_purchase_limit(LimitPeriod::Daily, 40_00),
        )
        .unwrap();

    let ack = f
        .platform
        .process_network_message(&pre_auth(f.card, 50_00, "txn-1", "msg-1"))
        .unwrap();
    assert_eq!(
        ack.outcome,
        AckOutcome::Declined {
            reasons: vec![DeclineReason::LimitExceeded {
                period: LimitPeriod::Daily,
                cap_units: 40_00
            }]
        }
    );

    // Within the cap passes, and consumed velocity blocks the next one.
    assert!(
        f.platform
            .process_network_message(&pre_auth(f.card, 30_00, "txn-2", "msg-2"))
            .unwrap()
            .is_approved()
    );
    let ack = f
        .platform
        .process_network_message(&pre_auth(f.card, 30_00, "txn-3", "msg-3"))
        .unwrap();
    assert!(matches!(ack.outcome, AckOutcome::Declined { .. }));
}

#[test]
fn frozen_card_declines() {
    let f = funded_fixture(100_00);

    let mut req = pre_auth(f.card, 10_00, "txn-1", "msg-1");
    req.card_status = CardStatus::Frozen;

    let ack = f.platform.process_network_message(&req).unwrap();
    assert_eq!(
        ack.outcome,
        AckOutcome::Declined {
            reasons: vec![DeclineReason::InvalidCardStatus]
        }
    );
}

#[test]
fn unknown_card_declines_without_writes() {
    let f = funded_fixture(100_00);

    let ack = f
        .platform
        .process_network_message(&pre_auth(CardId::new(), 10_00, "txn-1", "msg-1"))
        .unwrap();
    assert_eq!(
        ack.outcome,
        AckOutcome::Declined {
            reasons: vec![DeclineReason::CardNotFound]
        }
    );
    assert!(ack.message_id.is_none());
}

#[test]
fn expiry_sweep_releases_overdue_holds() {
    let f = funded_fixture(100_00);

    let hold = f
        .platform
        .place_hold(f.account.id, usd(-40_00), Utc::now() - Duration::seconds(1))
        .unwrap();
    assert_eq!(
        f.platform
            .account_balances(f.account.id)
            .unwrap()
            .available_balance,
        usd(60_00)
    );

    let released = f.platform.run_hold_expiry_sweep(Utc::now()).unwrap();
    assert_eq!(released, 1);

    let balances = f.platform.account_balances(f.account.id).unwrap();
    assert_eq!(balances.available_balance, usd(100_00));

    // Sweeping again is a no-op: the hold already left PLACED.
    assert_eq!(f.platform.run_hold_expiry_sweep(Utc::now()).unwrap(), 0);
    let released_hold = f.platform.release_hold(hold.id).unwrap();
    assert!(released_hold.is_none());
}

#[test]
fn deposit_hold_delays_availability() {
    let f = funded_fixture(0);

    f.platform
        .deposit_funds(f.account.id, usd(100_00), true, "First Bank", "1234")
        .unwrap();

    let balances = f.platform.account_balances(f.account.id).unwrap();
    assert_eq!(balances.ledger_balance, usd(100_00));
    assert_eq!(balances.available_balance, usd(0));
}

#[test]
fn withdrawal_respects_available_not_ledger_balance() {
    let f = funded_fixture(100_00);

    f.platform
        .process_network_message(&pre_auth(f.card, 80_00, "txn-1", "msg-1"))
        .unwrap();

    let err = f
        .platform
        .withdraw_funds(f.account.id, usd(50_00), "First Bank", "1234")
        .unwrap_err();
    assert!(matches!(err, DomainError::InsufficientFunds { .. }));

    assert!(
        f.platform
            .withdraw_funds(f.account.id, usd(20_00), "First Bank", "1234")
            .is_ok()
    );
}

#[test]
fn concurrent_withdrawals_conflict_and_retry_resolves() {
    let store = InMemoryStore::new();
    let accounts = AccountService::default();
    let now = Utc::now();

    let account = store
        .transact(|txn| {
            accounts.create_account(
                txn,
                BusinessId::new(),
                AllocationId::new(),
                None,
                tally_accounts::AccountType::Allocation,
                Currency::Usd,
            )
        })
        .unwrap();
    store
        .transact(|txn| {
            accounts.deposit_funds(txn, account.id, usd(100_00), false, "Bank", "1111", now)
        })
        .unwrap();

    // Both workers read the same balance.
    let mut first = store.begin().unwrap();
    let mut second = store.begin().unwrap();

    accounts
        .withdraw_funds(&mut first, account.id, usd(80_00), "Bank", "1111", now)
        .unwrap();
    store.commit(first).unwrap();

    accounts
        .withdraw_funds(&mut second, account.id, usd(80_00), "Bank", "1111", now)
        .unwrap();
    let err = store.commit(second).unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // Retrying from the top re-reads the balance and now fails on funds.
    let err = store
        .transact(|txn| accounts.withdraw_funds(txn, account.id, usd(80_00), "Bank", "1111", now))
        .unwrap_err();
    assert!(matches!(err, DomainError::InsufficientFunds { .. }));

    let txn = store.begin().unwrap();
    let (ledger, _) = accounts.balances(&txn, account.id).unwrap();
    assert_eq!(ledger, usd(20_00));
}

#[test]
fn reversal_symmetry_nets_to_zero_per_ledger_account() {
    let store = InMemoryStore::new();
    let ledger = LedgerService::default();
    let now = Utc::now();

    store
        .transact(|txn| {
            let a = ledger.create_ledger_account(txn, LedgerAccountType::Allocation, Currency::Usd)?;
            let b = ledger.create_ledger_account(txn, LedgerAccountType::Allocation, Currency::Usd)?;

            let posted =
                ledger.post(txn, JournalEntrySpec::transfer(a.id, b.id, usd(40_00)), now)?;
            let reversed = ledger.reverse(txn, posted.entry.id, now)?;

            for account_id in [a.id, b.id] {
                let net: i64 = posted
                    .postings
                    .iter()
                    .chain(reversed.postings.iter())
                    .filter(|p| p.ledger_account_id == account_id)
                    .map(|p| p.amount.units())
                    .sum();
                assert_eq!(net, 0);
            }
            assert_eq!(reversed.entry.reversal_of, Some(posted.entry.id));

            // Reversing a second time is a hard error.
            let err = ledger.reverse(txn, posted.entry.id, now).unwrap_err();
            assert!(matches!(err, DomainError::AlreadyReversed { .. }));
            Ok(())
        })
        .unwrap();
}

#[test]
fn unbalanced_entry_aborts_the_transaction() {
    let store = InMemoryStore::new();
    let ledger = LedgerService::default();
    let now = Utc::now();

    let err = store
        .transact(|txn| {
            let a = ledger.create_ledger_account(txn, LedgerAccountType::Allocation, Currency::Usd)?;
            let b = ledger.create_ledger_account(txn, LedgerAccountType::Allocation, Currency::Usd)?;
            let spec = JournalEntrySpec::new(vec![
                tally_ledger::PostingSpec {
                    ledger_account_id: a.id,
                    amount: usd(-10_00),
                },
                tally_ledger::PostingSpec {
                    ledger_account_id: b.id,
                    amount: usd(9_99),
                },
            ]);
            ledger.post(txn, spec, now)
        })
        .unwrap_err();
    assert_eq!(err, DomainError::UnbalancedEntry { sum: -1 });
}

#[test]
fn incremental_authorization_replaces_the_prior_hold() {
    let f = funded_fixture(100_00);

    f.platform
        .process_network_message(&pre_auth(f.card, 30_00, "txn-1", "msg-1"))
        .unwrap();
    assert_eq!(
        f.platform
            .account_balances(f.account.id)
            .unwrap()
            .available_balance,
        usd(70_00)
    );

    // The network re-authorizes the lifecycle at a higher amount.
    let ack = f
        .platform
        .process_network_message(&pre_auth(f.card, 45_00, "txn-1", "msg-2"))
        .unwrap();
    assert_eq!(ack.outcome, AckOutcome::Approved { amount: usd(45_00) });

    // One live hold for the new amount, not two.
    assert_eq!(
        f.platform
            .account_balances(f.account.id)
            .unwrap()
            .available_balance,
        usd(55_00)
    );
}

#[test]
fn hold_status_transitions_are_guarded_at_the_facade() {
    let f = funded_fixture(100_00);

    let hold = f
        .platform
        .place_hold(f.account.id, usd(-25_00), Utc::now() + Duration::days(1))
        .unwrap();
    assert_eq!(hold.status, HoldStatus::Placed);

    let (captured, adjustment) = f.platform.capture_hold(hold.id, usd(-25_00)).unwrap();
    assert_eq!(captured.status, HoldStatus::Captured);
    assert_eq!(adjustment.amount, usd(-25_00));

    // Releasing after capture is a state error, not a no-op.
    let err = f.platform.release_hold(hold.id).unwrap_err();
    assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
}
