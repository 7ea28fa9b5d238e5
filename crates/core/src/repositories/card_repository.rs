use chrono::Utc;
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::CardStatus;
use lendora_primitives::models::virtual_card::{NewVirtualCard, VirtualCard};
use lendora_primitives::schema::virtual_cards;
use uuid::Uuid;

pub struct VirtualCardRepository;

impl VirtualCardRepository {
    pub fn create(conn: &mut PgConnection, card: NewVirtualCard<'_>) -> Result<VirtualCard, ApiError> {
        diesel::insert_into(virtual_cards::table)
            .values(&card)
            .returning(VirtualCard::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn find_by_id(conn: &mut PgConnection, card_id: Uuid) -> Result<VirtualCard, ApiError> {
        virtual_cards::table
            .find(card_id)
            .select(VirtualCard::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Card not found".into()).into())
    }

    /// Serializes every movement on one card, ahead of any account lock.
    pub fn lock(conn: &mut PgConnection, card_id: Uuid) -> Result<VirtualCard, ApiError> {
        virtual_cards::table
            .find(card_id)
            .select(VirtualCard::as_select())
            .for_update()
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Card not found".into()).into())
    }

    pub fn find_for_user(
        conn: &mut PgConnection,
        card_id: Uuid,
        user_id: Uuid,
    ) -> Result<VirtualCard, ApiError> {
        virtual_cards::table
            .find(card_id)
            .filter(virtual_cards::user_id.eq(user_id))
            .select(VirtualCard::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Card not found".into()).into())
    }

    pub fn list_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<VirtualCard>, ApiError> {
        virtual_cards::table
            .filter(virtual_cards::user_id.eq(user_id))
            .order(virtual_cards::created_at.desc())
            .select(VirtualCard::as_select())
            .load(conn)
            .map_err(ApiError::Database)
    }

    pub fn set_status(
        conn: &mut PgConnection,
        card_id: Uuid,
        status: CardStatus,
    ) -> Result<VirtualCard, ApiError> {
        diesel::update(virtual_cards::table.find(card_id))
            .set((
                virtual_cards::status.eq(status),
                virtual_cards::updated_at.eq(Utc::now()),
            ))
            .returning(VirtualCard::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn touch_last_funded(conn: &mut PgConnection, card_id: Uuid) -> Result<(), ApiError> {
        let now = Utc::now();
        diesel::update(virtual_cards::table.find(card_id))
            .set((
                virtual_cards::last_funded_at.eq(Some(now)),
                virtual_cards::updated_at.eq(now),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }
}
