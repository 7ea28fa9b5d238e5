use crate::models::entities::enum_types::{CardStatus, CurrencyCode};
use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::virtual_cards)]
pub struct VirtualCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub external_card_id: String,
    pub masked_pan: Option<String>,
    pub currency: CurrencyCode,
    pub status: CardStatus,
    pub last_funded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::virtual_cards)]
pub struct NewVirtualCard<'a> {
    pub user_id: Uuid,
    pub external_card_id: &'a str,
    pub masked_pan: Option<&'a str>,
    pub currency: CurrencyCode,
    pub status: CardStatus,
}
