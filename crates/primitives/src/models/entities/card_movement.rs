use crate::models::entities::enum_types::{CardMovementKind, CardMovementStatus};
use chrono::{DateTime, Utc};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::card_movements)]
pub struct CardMovement {
    pub id: Uuid,
    pub virtual_card_id: Uuid,
    pub reference: String,
    pub base_reference: String,
    pub attempt: i32,
    pub kind: CardMovementKind,
    pub amount: i64,
    pub status: CardMovementStatus,
    pub debit_entry_id: Uuid,
    /// Bumped each time an abandoned claim is taken over.
    pub claims: i32,
    pub claimed_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::card_movements)]
pub struct NewCardMovement<'a> {
    pub virtual_card_id: Uuid,
    pub reference: &'a str,
    pub base_reference: &'a str,
    pub attempt: i32,
    pub kind: CardMovementKind,
    pub amount: i64,
    pub debit_entry_id: Uuid,
}
