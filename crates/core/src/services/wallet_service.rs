use crate::app_state::AppState;
use crate::repositories::journal_repository::JournalRepository;
use crate::repositories::wallet_repository::WalletRepository;
use crate::services::audit_service::AuditService;
use crate::services::ledger_service::LedgerService;
use crate::services::payment_service::PaymentService;
use crate::services::reconciliation_service::ReconciliationService;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lendora_primitives::error::ApiError;
use lendora_primitives::models::entities::enum_types::PaymentType;
use lendora_primitives::models::payment_dto::{
    InitializePaymentRequest, InitializePaymentResponse, ReconcileResponse,
};
use lendora_primitives::models::wallet::Wallet;
use lendora_primitives::models::wallet_dto::{
    FundWalletRequest, JournalEntryDto, JournalResponse, WalletAuditReport, WalletDto,
};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_JOURNAL_LIMIT: i64 = 50;
const MAX_JOURNAL_LIMIT: i64 = 200;

/// Compares the cached balance with the journal's signed sum.
pub fn audit_report(wallet: &Wallet, journal_balance: i64, entry_count: i64) -> WalletAuditReport {
    let drift = wallet.balance - journal_balance;
    WalletAuditReport {
        wallet_id: wallet.id,
        stored_balance: wallet.balance,
        journal_balance,
        drift,
        entry_count,
        consistent: drift == 0,
        since: None,
        net_change_since: None,
    }
}

pub struct WalletService;

impl WalletService {
    /// The caller's main wallet in the default currency, opened on first read.
    pub async fn get_wallet(state: &AppState, user_id: Uuid) -> Result<WalletDto, ApiError> {
        let mut conn = state.db.get().map_err(|e| {
            error!("wallets.get: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection("Database unavailable".into())
        })?;

        let wallet = LedgerService::ensure_wallet(&mut conn, user_id, state.config.default_currency)?;
        Ok(WalletDto::from(wallet))
    }

    pub async fn list_transactions(
        state: &AppState,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<JournalResponse, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_JOURNAL_LIMIT).clamp(1, MAX_JOURNAL_LIMIT);

        let mut conn = state.db.get()?;
        let wallet = LedgerService::ensure_wallet(&mut conn, user_id, state.config.default_currency)?;
        let entries = JournalRepository::list_for_wallet(&mut conn, wallet.id, limit)?;

        Ok(JournalResponse {
            wallet_id: wallet.id,
            entries: entries.into_iter().map(JournalEntryDto::from).collect(),
        })
    }

    /// Starts a gateway checkout that credits the wallet once confirmed.
    pub async fn fund(
        state: &AppState,
        user_id: Uuid,
        req: FundWalletRequest,
    ) -> Result<InitializePaymentResponse, ApiError> {
        req.validate()?;

        PaymentService::initialize(
            state,
            user_id,
            InitializePaymentRequest {
                amount: req.amount,
                gateway: req.gateway,
                payment_type: PaymentType::WalletFunding,
                reference: req.reference,
                loan_id: None,
                repayment_id: None,
                virtual_card_id: None,
                callback_url: req.callback_url,
            },
        )
        .await
    }

    pub async fn verify_funding(
        state: &AppState,
        user_id: Uuid,
        reference: &str,
        provider_transaction_id: Option<&str>,
    ) -> Result<ReconcileResponse, ApiError> {
        ReconciliationService::reconcile_for_user(state, user_id, reference, provider_transaction_id).await
    }

    pub async fn lock(
        state: &AppState,
        admin_id: Uuid,
        wallet_id: Uuid,
        reason: &str,
    ) -> Result<WalletDto, ApiError> {
        let mut conn = state.db.get()?;
        let wallet = conn.transaction::<_, ApiError, _>(|conn| {
            let wallet = LedgerService::lock(conn, wallet_id, reason)?;
            AuditService::record(
                conn,
                Some(admin_id),
                "wallet.locked",
                "wallet",
                &wallet_id.to_string(),
                json!({ "reason": reason }),
            )?;
            Ok(wallet)
        })?;

        warn!(%wallet_id, reason, "wallets.lock: debits suspended");
        Ok(WalletDto::from(wallet))
    }

    pub async fn unlock(state: &AppState, admin_id: Uuid, wallet_id: Uuid) -> Result<WalletDto, ApiError> {
        let mut conn = state.db.get()?;
        let wallet = conn.transaction::<_, ApiError, _>(|conn| {
            let wallet = LedgerService::unlock(conn, wallet_id)?;
            AuditService::record(
                conn,
                Some(admin_id),
                "wallet.unlocked",
                "wallet",
                &wallet_id.to_string(),
                json!({}),
            )?;
            Ok(wallet)
        })?;

        info!(%wallet_id, "wallets.unlock: debits restored");
        Ok(WalletDto::from(wallet))
    }

    /// Recomputes the balance from the journal. Read-only; drift is reported,
    /// never corrected. With `since`, the net movement over that window is
    /// reported alongside.
    pub async fn audit_wallet(
        state: &AppState,
        wallet_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<WalletAuditReport, ApiError> {
        let mut conn = state.db.get()?;

        let report = conn.transaction::<_, ApiError, _>(|conn| {
            let wallet = WalletRepository::find_by_id(conn, wallet_id)?;
            let journal_balance = JournalRepository::journal_balance(conn, wallet.id)?;
            let entry_count = JournalRepository::count_completed(conn, wallet.id)?;
            let mut report = audit_report(&wallet, journal_balance, entry_count);
            if let Some(since) = since {
                report.since = Some(since);
                report.net_change_since =
                    Some(JournalRepository::sum_completed_since(conn, wallet.id, since)?);
            }
            Ok(report)
        })?;

        if !report.consistent {
            error!(%wallet_id, drift = report.drift, "wallets.audit: balance drift detected");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lendora_primitives::models::entities::enum_types::CurrencyCode;

    fn wallet(balance: i64) -> Wallet {
        Wallet {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            virtual_card_id: None,
            currency: CurrencyCode::NGN,
            balance,
            is_active: true,
            is_locked: false,
            lock_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn matching_journal_is_consistent() {
        let report = audit_report(&wallet(12_500), 12_500, 4);
        assert!(report.consistent);
        assert_eq!(report.drift, 0);
        assert_eq!(report.entry_count, 4);
    }

    #[test]
    fn drift_is_stored_minus_journal() {
        let report = audit_report(&wallet(10_000), 12_500, 3);
        assert!(!report.consistent);
        assert_eq!(report.drift, -2_500);
    }
}
