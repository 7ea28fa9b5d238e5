use crate::models::entities::enum_types::CurrencyCode;
use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

/// A ledger account. Every user owns one wallet per currency and every
/// virtual card owns exactly one account of its own (`virtual_card_id` set).
///
/// `balance` is a cached projection of the completed journal entries and is
/// only ever written by the ledger service.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::wallets)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub virtual_card_id: Option<Uuid>,
    pub currency: CurrencyCode,
    pub balance: i64,
    pub is_active: bool,
    pub is_locked: bool,
    pub lock_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::wallets)]
pub struct NewWallet {
    pub user_id: Uuid,
    pub virtual_card_id: Option<Uuid>,
    pub currency: CurrencyCode,
}
