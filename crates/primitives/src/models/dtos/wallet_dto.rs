use crate::models::entities::enum_types::{
    CurrencyCode, EntryCategory, GatewayProvider, LedgerEntryStatus, LedgerEntryType, LedgerSource,
};
use crate::models::entities::wallet::Wallet;
use crate::models::entities::wallet_transaction::WalletTransaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// --- Wallet & Balance DTOs ---

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletDto {
    pub id: Uuid,
    pub currency: CurrencyCode,
    pub balance: i64, // minor units
    pub is_active: bool,
    pub is_locked: bool,
    pub lock_reason: Option<String>,
}

impl From<Wallet> for WalletDto {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            currency: wallet.currency,
            balance: wallet.balance,
            is_active: wallet.is_active,
            is_locked: wallet.is_locked,
            lock_reason: wallet.lock_reason,
        }
    }
}

// --- Journal DTOs ---

#[derive(Debug, Serialize, ToSchema)]
pub struct JournalEntryDto {
    pub id: Uuid,
    pub reference: String,
    pub entry_type: LedgerEntryType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub category: EntryCategory,
    pub source: LedgerSource,
    pub source_reference: Option<String>,
    pub status: LedgerEntryStatus,
    pub reverses_entry_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<WalletTransaction> for JournalEntryDto {
    fn from(tx: WalletTransaction) -> Self {
        Self {
            id: tx.id,
            reference: tx.reference,
            entry_type: tx.entry_type,
            amount: tx.amount,
            balance_before: tx.balance_before,
            balance_after: tx.balance_after,
            description: tx.description,
            category: tx.category,
            source: tx.source,
            source_reference: tx.source_reference,
            status: tx.status,
            reverses_entry_id: tx.reverses_entry_id,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostingResponse {
    pub entry: JournalEntryDto,
    /// `true` when the reference had already been posted and nothing moved.
    pub replayed: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct JournalQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JournalResponse {
    pub wallet_id: Uuid,
    pub entries: Vec<JournalEntryDto>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct FundWalletRequest {
    #[validate(range(min = 100, message = "Amount must be at least 100 minor units"))]
    pub amount: i64,
    pub gateway: GatewayProvider,
    #[validate(length(min = 8, max = 64))]
    pub reference: String,
    pub callback_url: Option<String>,
}

// --- Admin DTOs ---

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LockWalletRequest {
    #[validate(length(min = 3, max = 255))]
    pub reason: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WalletAuditQuery {
    /// Also report the net journal movement from this instant onwards.
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletAuditReport {
    pub wallet_id: Uuid,
    pub stored_balance: i64,
    pub journal_balance: i64,
    pub drift: i64,
    pub entry_count: i64,
    pub consistent: bool,
    pub since: Option<DateTime<Utc>>,
    pub net_change_since: Option<i64>,
}
