use crate::models::entities::enum_types::{
    CurrencyCode, GatewayProvider, PaymentStatus, PaymentType,
};
use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::payments)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub loan_id: Option<Uuid>,
    pub repayment_id: Option<Uuid>,
    pub virtual_card_id: Option<Uuid>,
    pub amount: i64,
    pub currency: CurrencyCode,
    pub gateway: GatewayProvider,
    pub reference: String,
    pub gateway_reference: Option<String>,
    pub authorization_url: Option<String>,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    pub flagged_for_review: bool,
    pub failure_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::payments)]
pub struct NewPayment<'a> {
    pub user_id: Uuid,
    pub loan_id: Option<Uuid>,
    pub repayment_id: Option<Uuid>,
    pub virtual_card_id: Option<Uuid>,
    pub amount: i64,
    pub currency: CurrencyCode,
    pub gateway: GatewayProvider,
    pub reference: &'a str,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
}
