mod common;

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::TestServer;
use common::fixtures::{fund_wallet, wallet_of};
use common::mocks::{MockCardIssuer, ScriptedGateway};
use common::*;
use diesel::prelude::*;
use lendora_core::clients::GatewayRegistry;
use lendora_core::repositories::card_movement_repository::CardMovementRepository;
use lendora_core::repositories::journal_repository::JournalRepository;
use lendora_core::repositories::wallet_repository::WalletRepository;
use lendora_core::services::card_service::{reversal_reference, terminate_reference, CardService};
use lendora_core::services::ledger_service::{LedgerPosting, LedgerService};
use lendora_core::services::payment_service::PaymentService;
use lendora_core::services::reconciliation_service::ReconciliationService;
use lendora_core::services::wallet_service::WalletService;
use lendora_core::AppState;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::card_movement::NewCardMovement;
use lendora_primitives::models::entities::enum_types::{
    CardMovementKind, CardMovementStatus, CardStatus, EntryCategory, GatewayProvider,
    PaymentStatus, PaymentType,
};
use lendora_primitives::models::{InitializePaymentRequest, IssueCardRequest, VirtualCardDto};
use serde_json::Value;
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn scripted() -> (Arc<ScriptedGateway>, GatewayRegistry) {
    let gateway = Arc::new(ScriptedGateway::new(GatewayProvider::Paystack));
    let registry = registry_with(gateway.clone());
    (gateway, registry)
}

async fn issue(state: &AppState, user: Uuid) -> VirtualCardDto {
    CardService::issue_card(
        state,
        user,
        IssueCardRequest {
            currency: None,
            name_on_card: "Ada Obi".into(),
        },
    )
    .await
    .unwrap()
}

fn card_balance(state: &AppState, card_id: Uuid) -> i64 {
    let mut conn = state.db.get().unwrap();
    WalletRepository::find_card_account(&mut conn, card_id).unwrap().balance
}

/// Both accounts agree with their journals.
async fn assert_books_balance(state: &AppState, user: Uuid, card_id: Uuid) {
    let card_account = {
        let mut conn = state.db.get().unwrap();
        WalletRepository::find_card_account(&mut conn, card_id).unwrap()
    };
    for wallet_id in [wallet_of(state, user).id, card_account.id] {
        let report = WalletService::audit_wallet(state, wallet_id, None).await.unwrap();
        assert!(report.consistent, "drift on {}: {}", wallet_id, report.drift);
    }
}

fn card_funding(amount: i64, reference: &str, card_id: Uuid) -> InitializePaymentRequest {
    InitializePaymentRequest {
        amount,
        gateway: GatewayProvider::Paystack,
        payment_type: PaymentType::CardFunding,
        reference: reference.to_string(),
        loan_id: None,
        repayment_id: None,
        virtual_card_id: Some(card_id),
        callback_url: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_retry_during_slow_failing_issuer_cannot_complete_a_reversed_debit() {
    let (_, registry) = scripted();
    let issuer = Arc::new(MockCardIssuer::slow(Duration::from_millis(600)));
    issuer.set_failing(true);
    let Some(state) = db_state(registry, issuer.clone()) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    fund_wallet(&state, user, 10_000);
    let card = issue(&state, user).await;

    let first = {
        let state = state.clone();
        tokio::spawn(async move { CardService::fund(&state, user, card.id, 4000, "CF-RACE").await })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;

    // the first caller still holds the claim
    let retry = CardService::fund(&state, user, card.id, 4000, "CF-RACE").await;
    assert!(matches!(
        retry,
        Err(ApiError::Ledger(LedgerError::InvalidState(_)))
    ));

    let first = first.await.unwrap();
    assert!(matches!(
        first,
        Err(ApiError::Ledger(LedgerError::CardProvisioningFailed(_)))
    ));

    let after = CardService::fund(&state, user, card.id, 4000, "CF-RACE").await;
    assert!(matches!(
        after,
        Err(ApiError::Ledger(LedgerError::CardProvisioningFailed(_)))
    ));

    assert_eq!(issuer.fund_calls.load(Ordering::SeqCst), 1);
    assert_eq!(issuer.keys(), vec!["CF-RACE".to_string()]);
    assert_eq!(wallet_of(&state, user).balance, 10_000);
    assert_eq!(card_balance(&state, card.id), 0);

    let mut conn = state.db.get().unwrap();
    assert!(JournalRepository::find_by_reference(&mut conn, "CF-RACE:card")
        .unwrap()
        .is_none());
    assert!(JournalRepository::find_by_reference(&mut conn, &reversal_reference("CF-RACE"))
        .unwrap()
        .is_some());
    let movement = CardMovementRepository::latest_attempt(&mut conn, card.id, "CF-RACE")
        .unwrap()
        .unwrap();
    assert_eq!(movement.status, CardMovementStatus::Reversed);
    assert_eq!(movement.last_error.as_deref(), Some("gateway rejected: card declined"));
    drop(conn);

    assert_books_balance(&state, user, card.id).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_retry_during_slow_successful_issuer_replays_the_completion() {
    let (_, registry) = scripted();
    let issuer = Arc::new(MockCardIssuer::slow(Duration::from_millis(600)));
    let Some(state) = db_state(registry, issuer.clone()) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    fund_wallet(&state, user, 10_000);
    let card = issue(&state, user).await;

    let first = {
        let state = state.clone();
        tokio::spawn(async move { CardService::fund(&state, user, card.id, 4000, "CF-SLOW-OK").await })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;

    let retry = CardService::fund(&state, user, card.id, 4000, "CF-SLOW-OK").await;
    assert!(matches!(
        retry,
        Err(ApiError::Ledger(LedgerError::InvalidState(_)))
    ));

    let first = first.await.unwrap().unwrap();
    assert!(!first.replayed);

    let replay = CardService::fund(&state, user, card.id, 4000, "CF-SLOW-OK").await.unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.card_balance, 4000);
    assert_eq!(replay.wallet_balance, 6000);

    assert_eq!(issuer.fund_calls.load(Ordering::SeqCst), 1);
    let mut conn = state.db.get().unwrap();
    assert!(
        JournalRepository::find_by_reference(&mut conn, &reversal_reference("CF-SLOW-OK"))
            .unwrap()
            .is_none()
    );
    drop(conn);
    assert_books_balance(&state, user, card.id).await;
}

#[tokio::test]
#[serial]
async fn test_issuer_timeout_reverses_the_debit() {
    let (_, registry) = scripted();
    let issuer = Arc::new(MockCardIssuer::slow(Duration::from_millis(2500)));
    let mut config = test_config();
    config.gateway_timeout_secs = 1;
    let Some(state) = db_state_with(config, registry, issuer.clone()) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    fund_wallet(&state, user, 5000);
    let card = issue(&state, user).await;

    let started = std::time::Instant::now();
    let result = CardService::fund(&state, user, card.id, 2000, "CF-TIMEOUT").await;
    assert!(started.elapsed() < Duration::from_millis(2400));

    match result {
        Err(ApiError::Ledger(LedgerError::CardProvisioningFailed(message))) => {
            assert!(message.contains("timed out"), "{}", message)
        }
        other => panic!("expected a reversed movement, got {:?}", other.map(|m| m.reference)),
    }

    assert_eq!(wallet_of(&state, user).balance, 5000);
    assert_eq!(card_balance(&state, card.id), 0);

    let mut conn = state.db.get().unwrap();
    let movement = CardMovementRepository::latest_attempt(&mut conn, card.id, "CF-TIMEOUT")
        .unwrap()
        .unwrap();
    assert_eq!(movement.status, CardMovementStatus::Reversed);
    drop(conn);
    assert_books_balance(&state, user, card.id).await;
}

#[tokio::test]
#[serial]
async fn test_terminate_retries_the_sweep_after_the_issuer_recovers() {
    let (_, registry) = scripted();
    let issuer = Arc::new(MockCardIssuer::default());
    let Some(state) = db_state(registry, issuer.clone()) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    fund_wallet(&state, user, 5000);
    let card = issue(&state, user).await;
    CardService::fund(&state, user, card.id, 3000, "CF-BEFORE-TERMINATE").await.unwrap();

    issuer.set_failing(true);
    let failed = CardService::terminate(&state, user, card.id).await;
    assert!(matches!(
        failed,
        Err(ApiError::Ledger(LedgerError::CardProvisioningFailed(_)))
    ));
    assert_eq!(card_balance(&state, card.id), 3000);
    assert_eq!(wallet_of(&state, user).balance, 2000);

    issuer.set_failing(false);
    let terminated = CardService::terminate(&state, user, card.id).await.unwrap();
    assert_eq!(terminated.status, CardStatus::Terminated);
    assert_eq!(card_balance(&state, card.id), 0);
    assert_eq!(wallet_of(&state, user).balance, 5000);

    let base = terminate_reference(card.id);
    assert_eq!(
        issuer.keys(),
        vec![
            "CF-BEFORE-TERMINATE".to_string(),
            base.clone(),
            format!("{}#2", base),
        ]
    );

    let mut conn = state.db.get().unwrap();
    let completion = JournalRepository::find_by_reference(&mut conn, &format!("{}#2:wallet", base))
        .unwrap()
        .expect("second sweep completed");
    assert_eq!(completion.amount, 3000);
    drop(conn);

    // already terminated: nothing moves again
    CardService::terminate(&state, user, card.id).await.unwrap();
    assert_eq!(issuer.withdraw_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
#[serial]
async fn test_stale_claim_is_taken_over_and_settled_by_the_sweep() {
    let (_, registry) = scripted();
    let issuer = Arc::new(MockCardIssuer::default());
    let Some(state) = db_state(registry, issuer.clone()) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    let wallet = fund_wallet(&state, user, 5000);
    let card = issue(&state, user).await;

    // a caller debited and claimed, then died before the issuer answered
    let mut conn = state.db.get().unwrap();
    let debit = LedgerService::debit(
        &mut conn,
        LedgerPosting::new(wallet.id, 1500, EntryCategory::CardFunding, "CF-ORPHAN"),
    )
    .unwrap();
    CardMovementRepository::create(
        &mut conn,
        NewCardMovement {
            virtual_card_id: card.id,
            reference: "CF-ORPHAN",
            base_reference: "CF-ORPHAN",
            attempt: 1,
            kind: CardMovementKind::Fund,
            amount: 1500,
            debit_entry_id: debit.entry.id,
        },
    )
    .unwrap();
    diesel::sql_query("UPDATE card_movements SET claimed_at = now() - interval '1 hour'")
        .execute(&mut conn)
        .unwrap();
    drop(conn);

    let settled = CardService::resume_abandoned(&state, 10).await.unwrap();
    assert_eq!(settled, 1);
    assert_eq!(card_balance(&state, card.id), 1500);
    assert_eq!(wallet_of(&state, user).balance, 3500);
    assert_eq!(issuer.keys(), vec!["CF-ORPHAN".to_string()]);

    // nothing left to pick up
    assert_eq!(CardService::resume_abandoned(&state, 10).await.unwrap(), 0);

    let replay = CardService::fund(&state, user, card.id, 1500, "CF-ORPHAN").await.unwrap();
    assert!(replay.replayed);
    assert_eq!(issuer.fund_calls.load(Ordering::SeqCst), 1);
    assert_books_balance(&state, user, card.id).await;
}

#[tokio::test]
#[serial]
async fn test_card_bridge_retry_moves_stranded_funds_onto_the_card() {
    let (gateway, registry) = scripted();
    let issuer = Arc::new(MockCardIssuer::failing());
    let Some(state) = db_state(registry, issuer.clone()) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    let card = issue(&state, user).await;

    PaymentService::initialize(&state, user, card_funding(3000, "CARD-TOPUP-RETRY", card.id))
        .await
        .unwrap();
    gateway.confirm(3000, "NGN");

    let settled = ReconciliationService::reconcile(&state, "CARD-TOPUP-RETRY", None)
        .await
        .unwrap();
    assert_eq!(settled.payment.status, PaymentStatus::Success);
    assert_eq!(settled.card_funded, Some(false));
    assert_eq!(wallet_of(&state, user).balance, 3000);

    issuer.set_failing(false);
    let server = TestServer::new(create_test_app(state.clone())).unwrap();
    let auth = HeaderValue::from_str(&format!("Bearer {}", token_for(user, "customer"))).unwrap();

    let response = server
        .post("/api/payments/CARD-TOPUP-RETRY/card-funding/retry")
        .add_header(AUTHORIZATION, auth.clone())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["reference"], "CARD-TOPUP-RETRY:card#2");
    assert_eq!(body["card_balance"], 3000);
    assert_eq!(body["wallet_balance"], 0);
    assert_eq!(body["replayed"], false);

    let response = server
        .post("/api/payments/CARD-TOPUP-RETRY/card-funding/retry")
        .add_header(AUTHORIZATION, auth)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["replayed"], true);

    assert_eq!(
        issuer.keys(),
        vec![
            "CARD-TOPUP-RETRY:card".to_string(),
            "CARD-TOPUP-RETRY:card#2".to_string(),
        ]
    );
    assert_books_balance(&state, user, card.id).await;

    // somebody else's payment is invisible
    let stranger = create_user(&mut state.db.get().unwrap(), "customer");
    let response = server
        .post("/api/payments/CARD-TOPUP-RETRY/card-funding/retry")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token_for(stranger, "customer"))).unwrap(),
        )
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn test_card_bridge_retry_needs_a_settled_card_funding() {
    let (_, registry) = scripted();
    let Some(state) = db_state(registry, Arc::new(MockCardIssuer::default())) else {
        return;
    };
    let user = create_user(&mut state.db.get().unwrap(), "customer");
    let card = issue(&state, user).await;

    PaymentService::initialize(&state, user, card_funding(3000, "CARD-TOPUP-PENDING", card.id))
        .await
        .unwrap();

    let pending = ReconciliationService::retry_card_bridge(&state, user, "CARD-TOPUP-PENDING").await;
    assert!(matches!(
        pending,
        Err(ApiError::Ledger(LedgerError::InvalidState(_)))
    ));

    let unknown = ReconciliationService::retry_card_bridge(&state, user, "NO-SUCH-PAYMENT").await;
    assert!(matches!(
        unknown,
        Err(ApiError::Ledger(LedgerError::PaymentNotFound(_)))
    ));
    assert_eq!(card_balance(&state, card.id), 0);
}
