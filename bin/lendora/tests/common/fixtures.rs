use lendora_core::repositories::loan_repository::LoanRepository;
use lendora_core::services::ledger_service::{LedgerPosting, LedgerService};
use lendora_core::services::loan_service::LoanService;
use lendora_core::AppState;
use lendora_primitives::models::entities::enum_types::{CurrencyCode, EntryCategory};
use lendora_primitives::models::{LoanApplicationRequest, LoanDetailsResponse};
use lendora_primitives::models::wallet::Wallet;
use uuid::Uuid;

/// Credits `amount` to the user's NGN wallet as if a funding had settled.
pub fn fund_wallet(state: &AppState, user_id: Uuid, amount: i64) -> Wallet {
    let mut conn = state.db.get().expect("db connection");
    let wallet = LedgerService::ensure_wallet(&mut conn, user_id, CurrencyCode::NGN).expect("wallet");
    let reference = format!("seed-{}", Uuid::new_v4());

    LedgerService::credit(
        &mut conn,
        LedgerPosting::new(wallet.id, amount, EntryCategory::WalletFunding, &reference),
    )
    .expect("seed credit");

    wallet_of(state, user_id)
}

pub fn wallet_of(state: &AppState, user_id: Uuid) -> Wallet {
    let mut conn = state.db.get().expect("db connection");
    LedgerService::ensure_wallet(&mut conn, user_id, CurrencyCode::NGN).expect("wallet")
}

/// Walks a loan through review, approval, fee settlement and disbursement.
pub async fn disbursed_loan(
    state: &AppState,
    admin_id: Uuid,
    user_id: Uuid,
    principal: i64,
    interest_rate_bps: i32,
    tenure_months: i32,
) -> LoanDetailsResponse {
    let loan = LoanService::apply_for_loan(
        state,
        user_id,
        LoanApplicationRequest {
            principal,
            interest_rate_bps,
            tenure_months,
            currency: Some(CurrencyCode::NGN),
        },
    )
    .await
    .expect("apply");

    LoanService::start_review(state, admin_id, loan.id).await.expect("review");
    LoanService::approve(state, admin_id, loan.id).await.expect("approve");

    {
        let mut conn = state.db.get().expect("db connection");
        LoanRepository::mark_admin_fee_paid(&mut conn, loan.id).expect("fee paid");
    }

    LoanService::disburse(state, admin_id, loan.id).await.expect("disburse")
}
