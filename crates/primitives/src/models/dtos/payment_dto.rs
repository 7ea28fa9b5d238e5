use crate::models::entities::enum_types::{
    CurrencyCode, GatewayProvider, PaymentStatus, PaymentType,
};
use crate::models::entities::payment::Payment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct InitializePaymentRequest {
    /// Ignored for `admin_fee`, where the loan's fee is charged.
    #[validate(range(min = 100, message = "Amount must be at least 100 minor units"))]
    pub amount: i64,
    pub gateway: GatewayProvider,
    pub payment_type: PaymentType,
    #[validate(length(min = 8, max = 64))]
    pub reference: String,
    pub loan_id: Option<Uuid>,
    pub repayment_id: Option<Uuid>,
    pub virtual_card_id: Option<Uuid>,
    pub callback_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InitializePaymentResponse {
    pub reference: String,
    pub authorization_url: Option<String>,
    pub gateway: GatewayProvider,
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDto {
    pub id: Uuid,
    pub reference: String,
    pub amount: i64,
    pub currency: CurrencyCode,
    pub gateway: GatewayProvider,
    pub gateway_reference: Option<String>,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    pub flagged_for_review: bool,
    pub failure_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            reference: p.reference,
            amount: p.amount,
            currency: p.currency,
            gateway: p.gateway,
            gateway_reference: p.gateway_reference,
            status: p.status,
            payment_type: p.payment_type,
            flagged_for_review: p.flagged_for_review,
            failure_reason: p.failure_reason,
            paid_at: p.paid_at,
        }
    }
}

/// Result of a reconcile call. `settled` is `false` while the gateway has
/// not confirmed the payment yet.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    pub payment: PaymentDto,
    pub settled: bool,
    pub applied_to_loan: Option<i64>,
    pub left_in_wallet: Option<i64>,
    pub card_funded: Option<bool>,
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
pub struct VerifyPaymentRequest {
    /// Provider-side transaction id, when the client received one in the redirect.
    pub transaction_id: Option<String>,
}
