mod common;

use common::fixtures::{disbursed_loan, fund_wallet, wallet_of};
use common::mocks::{MockCardIssuer, ScriptedGateway};
use common::*;
use lendora_core::repositories::audit_repository::AuditLogRepository;
use lendora_core::repositories::journal_repository::JournalRepository;
use lendora_core::services::card_service::{reversal_reference, CardService};
use lendora_core::services::ledger_service::{LedgerPosting, LedgerService};
use lendora_core::services::loan_service::LoanService;
use lendora_core::services::payment_service::PaymentService;
use lendora_core::services::reconciliation_service::ReconciliationService;
use lendora_core::services::wallet_service::WalletService;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::{
    CardStatus, EntryCategory, GatewayProvider, LoanStatus, PaymentStatus, PaymentType,
    RepaymentStatus,
};
use lendora_primitives::models::{
    IssueCardRequest, InitializePaymentRequest, RepayFromWalletRequest,
};
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn scripted() -> (Arc<ScriptedGateway>, lendora_core::clients::GatewayRegistry) {
    let gateway = Arc::new(ScriptedGateway::new(GatewayProvider::Paystack));
    let registry = registry_with(gateway.clone());
    (gateway, registry)
}

fn funding_request(amount: i64, reference: &str) -> InitializePaymentRequest {
    InitializePaymentRequest {
        amount,
        gateway: GatewayProvider::Paystack,
        payment_type: PaymentType::WalletFunding,
        reference: reference.to_string(),
        loan_id: None,
        repayment_id: None,
        virtual_card_id: None,
        callback_url: None,
    }
}

#[tokio::test]
#[serial]
async fn test_gateway_credit_is_applied_once() {
    let (gateway, registry) = scripted();
    let Some(state) = db_state(registry, Arc::new(MockCardIssuer::default())) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");

    PaymentService::initialize(&state, user, funding_request(5000, "R1-FUNDING"))
        .await
        .unwrap();
    gateway.confirm(5000, "NGN");

    let first = ReconciliationService::reconcile(&state, "R1-FUNDING", None)
        .await
        .unwrap();
    let second = ReconciliationService::reconcile(&state, "R1-FUNDING", None)
        .await
        .unwrap();

    assert!(first.settled && second.settled);
    assert_eq!(first.payment.status, PaymentStatus::Success);
    assert_eq!(second.payment.status, PaymentStatus::Success);
    // terminal payments are answered from storage
    assert_eq!(gateway.calls(), 1);

    let wallet = wallet_of(&state, user);
    assert_eq!(wallet.balance, 5000);

    let mut conn = state.db.get().unwrap();
    assert_eq!(JournalRepository::count_completed(&mut conn, wallet.id).unwrap(), 1);
    assert_eq!(JournalRepository::journal_balance(&mut conn, wallet.id).unwrap(), 5000);
}

#[tokio::test]
#[serial]
async fn test_overdraft_is_refused_without_journal_entry() {
    let (_, registry) = scripted();
    let Some(state) = db_state(registry, Arc::new(MockCardIssuer::default())) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    let wallet = fund_wallet(&state, user, 5000);

    let mut conn = state.db.get().unwrap();
    let result = LedgerService::debit(
        &mut conn,
        LedgerPosting::new(wallet.id, 6000, EntryCategory::ManualTransfer, "OVERDRAFT-1"),
    );

    assert!(matches!(
        result,
        Err(ApiError::Ledger(LedgerError::InsufficientFunds {
            balance: 5000,
            requested: 6000
        }))
    ));
    assert_eq!(wallet_of(&state, user).balance, 5000);
    assert!(JournalRepository::find_by_reference(&mut conn, "OVERDRAFT-1")
        .unwrap()
        .is_none());
    assert_eq!(JournalRepository::count_completed(&mut conn, wallet.id).unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn test_repayment_fills_installments_in_order() {
    let (_, registry) = scripted();
    let Some(state) = db_state(registry, Arc::new(MockCardIssuer::default())) else {
        return;
    };
    let mut conn = state.db.get().unwrap();
    let admin = create_user(&mut conn, "admin");
    let user = create_user(&mut conn, "customer");
    drop(conn);

    // zero interest over two months: two installments of 300_000
    let loan = disbursed_loan(&state, admin, user, 600_000, 0, 2).await;
    assert_eq!(loan.schedule.len(), 2);
    assert!(loan.schedule.iter().all(|r| r.amount == 300_000));
    assert_eq!(wallet_of(&state, user).balance, 600_000);

    let allocation = LoanService::repay_from_wallet(
        &state,
        user,
        loan.loan.id,
        RepayFromWalletRequest {
            amount: 400_000,
            reference: "P1-REPAYMENT".into(),
        },
    )
    .await
    .unwrap();

    assert_eq!(allocation.applied, 400_000);
    assert_eq!(allocation.leftover, 0);
    assert_eq!(allocation.loan_status, LoanStatus::Active);

    let details = LoanService::get_loan(&state, user, loan.loan.id).await.unwrap();
    assert_eq!(details.schedule[0].status, RepaymentStatus::Paid);
    assert_eq!(details.schedule[0].amount_paid, 300_000);
    assert_eq!(details.schedule[1].status, RepaymentStatus::Partial);
    assert_eq!(details.schedule[1].amount_paid, 100_000);
    assert_eq!(details.outstanding, 200_000);
    assert_eq!(details.loan.status, LoanStatus::Active);

    assert_eq!(wallet_of(&state, user).balance, 200_000);

    // same reference again moves nothing
    let replay = LoanService::repay_from_wallet(
        &state,
        user,
        loan.loan.id,
        RepayFromWalletRequest {
            amount: 400_000,
            reference: "P1-REPAYMENT".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(replay.applied, 400_000);
    assert_eq!(wallet_of(&state, user).balance, 200_000);
    let details = LoanService::get_loan(&state, user, loan.loan.id).await.unwrap();
    assert_eq!(details.outstanding, 200_000);
}

#[tokio::test]
#[serial]
async fn test_wallet_repayment_is_capped_at_outstanding() {
    let (_, registry) = scripted();
    let Some(state) = db_state(registry, Arc::new(MockCardIssuer::default())) else {
        return;
    };
    let mut conn = state.db.get().unwrap();
    let admin = create_user(&mut conn, "admin");
    let user = create_user(&mut conn, "customer");
    drop(conn);

    let loan = disbursed_loan(&state, admin, user, 600_000, 0, 2).await;
    fund_wallet(&state, user, 100_000);

    let allocation = LoanService::repay_from_wallet(
        &state,
        user,
        loan.loan.id,
        RepayFromWalletRequest {
            amount: 700_000,
            reference: "P2-OVERPAY".into(),
        },
    )
    .await
    .unwrap();

    assert_eq!(allocation.applied, 600_000);
    assert_eq!(allocation.leftover, 100_000);
    assert_eq!(allocation.loan_status, LoanStatus::Completed);
    // only what the loan absorbed left the wallet
    assert_eq!(wallet_of(&state, user).balance, 100_000);
}

#[tokio::test]
#[serial]
async fn test_failed_card_funding_is_reversed() {
    let (_, registry) = scripted();
    let issuer = Arc::new(MockCardIssuer::failing());
    let Some(state) = db_state(registry, issuer.clone()) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    fund_wallet(&state, user, 5000);

    let card = CardService::issue_card(
        &state,
        user,
        IssueCardRequest {
            currency: None,
            name_on_card: "Ada Obi".into(),
        },
    )
    .await
    .unwrap();

    let result = CardService::fund(&state, user, card.id, 2000, "CARD-FUND-1").await;

    assert!(matches!(
        result,
        Err(ApiError::Ledger(LedgerError::CardProvisioningFailed(_)))
    ));
    assert_eq!(issuer.fund_calls.load(Ordering::SeqCst), 1);
    assert_eq!(wallet_of(&state, user).balance, 5000);

    let cards = CardService::list_cards(&state, user).await.unwrap();
    assert_eq!(cards[0].balance, 0);

    let mut conn = state.db.get().unwrap();
    let debit = JournalRepository::find_by_reference(&mut conn, "CARD-FUND-1")
        .unwrap()
        .expect("debit entry");
    let reversal = JournalRepository::find_by_reference(&mut conn, &reversal_reference("CARD-FUND-1"))
        .unwrap()
        .expect("reversal entry");
    assert_eq!(reversal.reverses_entry_id, Some(debit.id));
    assert_eq!(reversal.amount, 2000);
    assert_eq!(reversal.category, EntryCategory::Reversal);

    let trail = AuditLogRepository::find_by_target(&mut conn, "virtual_card", &card.id.to_string()).unwrap();
    assert!(trail.iter().any(|log| log.event_type == "card.movement_reversed"));

    // replaying a reversed movement does not debit again
    let replay = CardService::fund(&state, user, card.id, 2000, "CARD-FUND-1").await;
    assert!(replay.is_err());
    assert_eq!(wallet_of(&state, user).balance, 5000);
}

#[tokio::test]
#[serial]
async fn test_card_funding_moves_balance_once() {
    let (_, registry) = scripted();
    let issuer = Arc::new(MockCardIssuer::default());
    let Some(state) = db_state(registry, issuer.clone()) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    fund_wallet(&state, user, 5000);

    let card = CardService::issue_card(
        &state,
        user,
        IssueCardRequest {
            currency: None,
            name_on_card: "Ada Obi".into(),
        },
    )
    .await
    .unwrap();

    let first = CardService::fund(&state, user, card.id, 2000, "CARD-FUND-2").await.unwrap();
    let second = CardService::fund(&state, user, card.id, 2000, "CARD-FUND-2").await.unwrap();

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(second.card_balance, 2000);
    assert_eq!(second.wallet_balance, 3000);
    assert_eq!(issuer.fund_calls.load(Ordering::SeqCst), 1);

    // terminating sweeps the card balance back to the wallet
    let terminated = CardService::terminate(&state, user, card.id).await.unwrap();
    assert_eq!(terminated.status, CardStatus::Terminated);
    assert_eq!(terminated.balance, 0);
    assert_eq!(wallet_of(&state, user).balance, 5000);
    assert_eq!(issuer.withdraw_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[serial]
async fn test_locked_wallet_takes_credits_but_refuses_debits() {
    let (_, registry) = scripted();
    let Some(state) = db_state(registry, Arc::new(MockCardIssuer::default())) else {
        return;
    };
    let mut conn = state.db.get().unwrap();
    let admin = create_user(&mut conn, "admin");
    let user = create_user(&mut conn, "customer");
    drop(conn);
    let wallet = fund_wallet(&state, user, 5000);

    let locked = WalletService::lock(&state, admin, wallet.id, "chargeback investigation")
        .await
        .unwrap();
    assert!(locked.is_locked);

    let mut conn = state.db.get().unwrap();
    let debit = LedgerService::debit(
        &mut conn,
        LedgerPosting::new(wallet.id, 1000, EntryCategory::ManualTransfer, "LOCKED-DEBIT"),
    );
    assert!(matches!(debit, Err(ApiError::Ledger(LedgerError::AccountLocked(_)))));

    LedgerService::credit(
        &mut conn,
        LedgerPosting::new(wallet.id, 1000, EntryCategory::Reversal, "LOCKED-CREDIT"),
    )
    .unwrap();
    drop(conn);

    WalletService::unlock(&state, admin, wallet.id).await.unwrap();
    let report = WalletService::audit_wallet(&state, wallet.id, None).await.unwrap();
    assert_eq!(report.stored_balance, 6000);
    assert_eq!(report.journal_balance, 6000);
    assert_eq!(report.drift, 0);
    assert!(report.consistent);

    let mut conn = state.db.get().unwrap();
    let trail = AuditLogRepository::find_by_target(&mut conn, "wallet", &wallet.id.to_string()).unwrap();
    let events: Vec<&str> = trail.iter().map(|l| l.event_type.as_str()).collect();
    assert_eq!(events, vec!["wallet.locked", "wallet.unlocked"]);
}

#[tokio::test]
#[serial]
async fn test_reused_reference_with_other_amount_is_a_conflict() {
    let (_, registry) = scripted();
    let Some(state) = db_state(registry, Arc::new(MockCardIssuer::default())) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    let wallet = fund_wallet(&state, user, 5000);

    let mut conn = state.db.get().unwrap();
    LedgerService::debit(
        &mut conn,
        LedgerPosting::new(wallet.id, 1000, EntryCategory::ManualTransfer, "REUSED-REF"),
    )
    .unwrap();

    let replay = LedgerService::debit(
        &mut conn,
        LedgerPosting::new(wallet.id, 1000, EntryCategory::ManualTransfer, "REUSED-REF"),
    )
    .unwrap();
    assert!(replay.replayed);

    let conflict = LedgerService::debit(
        &mut conn,
        LedgerPosting::new(wallet.id, 1500, EntryCategory::ManualTransfer, "REUSED-REF"),
    );
    assert!(matches!(
        conflict,
        Err(ApiError::Ledger(LedgerError::DuplicateReference(_)))
    ));
    assert_eq!(wallet_of(&state, user).balance, 4000);
}

#[tokio::test]
#[serial]
async fn test_net_change_since_counts_only_entries_from_the_cutoff() {
    let (_, registry) = scripted();
    let Some(state) = db_state(registry, Arc::new(MockCardIssuer::default())) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    let wallet = fund_wallet(&state, user, 5000);

    let mut conn = state.db.get().unwrap();
    let cutoff = LedgerService::debit(
        &mut conn,
        LedgerPosting::new(wallet.id, 1200, EntryCategory::ManualTransfer, "WINDOW-DEBIT"),
    )
    .unwrap()
    .entry;
    LedgerService::credit(
        &mut conn,
        LedgerPosting::new(wallet.id, 300, EntryCategory::ManualTransfer, "WINDOW-CREDIT"),
    )
    .unwrap();

    let since = JournalRepository::sum_completed_since(&mut conn, wallet.id, cutoff.created_at).unwrap();
    assert_eq!(since, -900);
    let everything = JournalRepository::journal_balance(&mut conn, wallet.id).unwrap();
    assert_eq!(everything, 4100);
    drop(conn);

    let report = WalletService::audit_wallet(&state, wallet.id, Some(cutoff.created_at))
        .await
        .unwrap();
    assert!(report.consistent);
    assert_eq!(report.since, Some(cutoff.created_at));
    assert_eq!(report.net_change_since, Some(-900));

    let plain = WalletService::audit_wallet(&state, wallet.id, None).await.unwrap();
    assert_eq!(plain.net_change_since, None);
}
