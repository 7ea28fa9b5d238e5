use crate::models::entities::enum_types::{
    EntryCategory, LedgerEntryStatus, LedgerEntryType, LedgerSource,
};
use chrono::{DateTime, Utc};
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Journal entry. Append-only: rows are inserted `completed` and never updated;
/// corrections are new entries pointing back through `reverses_entry_id`.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(table_name = crate::schema::wallet_transactions)]
#[diesel(belongs_to(crate::models::entities::wallet::Wallet))]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
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
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn signed_amount(&self) -> i64 {
        match self.entry_type {
            LedgerEntryType::Credit => self.amount,
            LedgerEntryType::Debit => -self.amount,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::wallet_transactions)]
pub struct NewWalletTransaction<'a> {
    pub wallet_id: Uuid,
    pub reference: &'a str,
    pub entry_type: LedgerEntryType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub description: Option<&'a str>,
    pub category: EntryCategory,
    pub source: LedgerSource,
    pub source_reference: Option<&'a str>,
    pub status: LedgerEntryStatus,
    pub reverses_entry_id: Option<Uuid>,
    pub metadata: Value,
}
