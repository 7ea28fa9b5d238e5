mod common;

use common::fixtures::{fund_wallet, wallet_of};
use common::mocks::{MockCardIssuer, ScriptedGateway};
use common::*;
use lendora_core::repositories::wallet_repository::WalletRepository;
use lendora_core::services::card_service::CardService;
use lendora_core::services::ledger_service::{LedgerPosting, LedgerService};
use lendora_core::services::payment_service::PaymentService;
use lendora_core::services::reconciliation_service::ReconciliationService;
use lendora_core::services::wallet_service::WalletService;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::{
    EntryCategory, GatewayProvider, PaymentStatus, PaymentType,
};
use lendora_primitives::models::{InitializePaymentRequest, IssueCardRequest};
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_postings_on_one_account_serialize() {
    let registry = registry_with(Arc::new(ScriptedGateway::new(GatewayProvider::Paystack)));
    let Some(state) = db_state(registry, Arc::new(MockCardIssuer::default())) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    let wallet = fund_wallet(&state, user, 10_000);

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let state = state.clone();
        let wallet_id = wallet.id;
        tasks.spawn_blocking(move || {
            let mut conn = state.db.get().expect("db connection");
            let reference = format!("CONCURRENT-{}", i);
            if i % 2 == 0 {
                LedgerService::debit(
                    &mut conn,
                    LedgerPosting::new(wallet_id, 700, EntryCategory::ManualTransfer, &reference),
                )
            } else {
                LedgerService::credit(
                    &mut conn,
                    LedgerPosting::new(wallet_id, 300, EntryCategory::ManualTransfer, &reference),
                )
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let posted = joined.unwrap().unwrap();
        assert!(!posted.replayed);
        assert!(posted.entry.balance_after >= 0);
    }

    let report = WalletService::audit_wallet(&state, wallet.id, None).await.unwrap();
    assert_eq!(report.stored_balance, 10_000 - 10 * 700 + 10 * 300);
    assert!(report.consistent);
    assert_eq!(report.entry_count, 21);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_debits_never_overdraw() {
    let registry = registry_with(Arc::new(ScriptedGateway::new(GatewayProvider::Paystack)));
    let Some(state) = db_state(registry, Arc::new(MockCardIssuer::default())) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    let wallet = fund_wallet(&state, user, 6000);

    let mut tasks = JoinSet::new();
    for i in 0..8 {
        let state = state.clone();
        let wallet_id = wallet.id;
        tasks.spawn_blocking(move || {
            let mut conn = state.db.get().expect("db connection");
            LedgerService::debit(
                &mut conn,
                LedgerPosting::new(
                    wallet_id,
                    4000,
                    EntryCategory::ManualTransfer,
                    &format!("OVERDRAW-{}", i),
                ),
            )
        });
    }

    let mut accepted = 0;
    let mut refused = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => accepted += 1,
            Err(ApiError::Ledger(LedgerError::InsufficientFunds { .. })) => refused += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(refused, 7);
    assert_eq!(wallet_of(&state, user).balance, 2000);
    assert!(WalletService::audit_wallet(&state, wallet.id, None)
        .await
        .unwrap()
        .consistent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_reconciles_settle_and_bridge_once() {
    let gateway = Arc::new(ScriptedGateway::new(GatewayProvider::Paystack));
    let issuer = Arc::new(MockCardIssuer::slow(Duration::from_millis(200)));
    let Some(state) = db_state(registry_with(gateway.clone()), issuer.clone()) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
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

    PaymentService::initialize(
        &state,
        user,
        InitializePaymentRequest {
            amount: 4500,
            gateway: GatewayProvider::Paystack,
            payment_type: PaymentType::CardFunding,
            reference: "RACE-TOPUP".into(),
            loan_id: None,
            repayment_id: None,
            virtual_card_id: Some(card.id),
            callback_url: None,
        },
    )
    .await
    .unwrap();
    gateway.confirm(4500, "NGN");

    let mut tasks = JoinSet::new();
    for _ in 0..6 {
        let state = state.clone();
        tasks.spawn(async move {
            ReconciliationService::reconcile(&state, "RACE-TOPUP", None).await
        });
    }

    let mut bridged = 0;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.unwrap().unwrap();
        assert_eq!(result.payment.status, PaymentStatus::Success);
        if result.card_funded == Some(true) {
            bridged += 1;
        }
    }

    assert_eq!(bridged, 1);
    assert_eq!(issuer.fund_calls.load(Ordering::SeqCst), 1);
    assert_eq!(wallet_of(&state, user).balance, 0);

    let card_account = {
        let mut conn = state.db.get().unwrap();
        WalletRepository::find_card_account(&mut conn, card.id).unwrap()
    };
    assert_eq!(card_account.balance, 4500);
    for wallet_id in [wallet_of(&state, user).id, card_account.id] {
        assert!(WalletService::audit_wallet(&state, wallet_id, None)
            .await
            .unwrap()
            .consistent);
    }
}
