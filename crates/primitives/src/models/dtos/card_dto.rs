use crate::models::entities::enum_types::{CardStatus, CurrencyCode};
use crate::models::entities::virtual_card::VirtualCard;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct IssueCardRequest {
    pub currency: Option<CurrencyCode>,
    #[validate(length(min = 2, max = 100))]
    pub name_on_card: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CardAmountRequest {
    #[validate(range(min = 100, message = "Amount must be at least 100 minor units"))]
    pub amount: i64,
    #[validate(length(min = 8, max = 64))]
    pub reference: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VirtualCardDto {
    pub id: Uuid,
    pub masked_pan: Option<String>,
    pub currency: CurrencyCode,
    pub status: CardStatus,
    pub balance: i64,
    pub last_funded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl VirtualCardDto {
    pub fn new(card: VirtualCard, balance: i64) -> Self {
        Self {
            id: card.id,
            masked_pan: card.masked_pan,
            currency: card.currency,
            status: card.status,
            balance,
            last_funded_at: card.last_funded_at,
            created_at: card.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CardMovementResponse {
    pub card_id: Uuid,
    pub reference: String,
    pub amount: i64,
    pub card_balance: i64,
    pub wallet_balance: i64,
    pub replayed: bool,
}
