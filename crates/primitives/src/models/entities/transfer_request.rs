use crate::models::entities::enum_types::{CurrencyCode, TransferRequestStatus};
use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

/// Manual bank-transfer claim; credits the wallet only once an admin approves it.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::transfer_requests)]
pub struct TransferRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: CurrencyCode,
    pub bank_reference: String,
    pub status: TransferRequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::transfer_requests)]
pub struct NewTransferRequest<'a> {
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: CurrencyCode,
    pub bank_reference: &'a str,
    pub status: TransferRequestStatus,
}
