use crate::models::entities::enum_types::{CurrencyCode, TransferRequestStatus};
use crate::models::entities::transfer_request::TransferRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitTransferRequest {
    #[validate(range(min = 100, message = "Amount must be at least 100 minor units"))]
    pub amount: i64,
    #[validate(length(min = 4, max = 100))]
    pub bank_reference: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferRequestDto {
    pub id: Uuid,
    pub amount: i64,
    pub currency: CurrencyCode,
    pub bank_reference: String,
    pub status: TransferRequestStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<TransferRequest> for TransferRequestDto {
    fn from(t: TransferRequest) -> Self {
        Self {
            id: t.id,
            amount: t.amount,
            currency: t.currency,
            bank_reference: t.bank_reference,
            status: t.status,
            reviewed_at: t.reviewed_at,
            rejection_reason: t.rejection_reason,
            created_at: t.created_at,
        }
    }
}
