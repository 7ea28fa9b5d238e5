use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::card_movement::{CardMovement, NewCardMovement};
use lendora_primitives::models::entities::enum_types::CardMovementStatus;
use lendora_primitives::schema::card_movements;
use uuid::Uuid;

/// In-flight and settled wallet <-> card movements. A row is only ever
/// settled once: every transition out of `processing` is filtered on it.
pub struct CardMovementRepository;

impl CardMovementRepository {
    pub fn create(conn: &mut PgConnection, movement: NewCardMovement<'_>) -> Result<CardMovement, ApiError> {
        diesel::insert_into(card_movements::table)
            .values(&movement)
            .returning(CardMovement::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn find_by_reference_for_update(
        conn: &mut PgConnection,
        reference: &str,
    ) -> Result<Option<CardMovement>, ApiError> {
        card_movements::table
            .filter(card_movements::reference.eq(reference))
            .select(CardMovement::as_select())
            .for_update()
            .first(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    /// The newest attempt in a retry family, if any.
    pub fn latest_attempt(
        conn: &mut PgConnection,
        virtual_card_id: Uuid,
        base_reference: &str,
    ) -> Result<Option<CardMovement>, ApiError> {
        card_movements::table
            .filter(card_movements::virtual_card_id.eq(virtual_card_id))
            .filter(card_movements::base_reference.eq(base_reference))
            .order(card_movements::attempt.desc())
            .select(CardMovement::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    /// Takes over an abandoned claim. The returned row carries the new claim
    /// number; a settlement from the previous claim will no longer match it.
    pub fn reclaim(
        conn: &mut PgConnection,
        movement_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CardMovement, ApiError> {
        diesel::update(
            card_movements::table
                .find(movement_id)
                .filter(card_movements::status.eq(CardMovementStatus::Processing)),
        )
        .set((
            card_movements::claims.eq(card_movements::claims + 1),
            card_movements::claimed_at.eq(now),
            card_movements::updated_at.eq(now),
        ))
        .returning(CardMovement::as_returning())
        .get_result(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| LedgerError::InvalidState("Card movement is already settled".into()).into())
    }

    /// `processing -> completed | reversed`.
    pub fn settle(
        conn: &mut PgConnection,
        movement_id: Uuid,
        status: CardMovementStatus,
        last_error: Option<&str>,
    ) -> Result<CardMovement, ApiError> {
        diesel::update(
            card_movements::table
                .find(movement_id)
                .filter(card_movements::status.eq(CardMovementStatus::Processing)),
        )
        .set((
            card_movements::status.eq(status),
            card_movements::last_error.eq(last_error),
            card_movements::updated_at.eq(Utc::now()),
        ))
        .returning(CardMovement::as_returning())
        .get_result(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| LedgerError::InvalidState("Card movement is already settled".into()).into())
    }

    /// Processing movements whose claim is older than `claimed_before`, oldest first.
    pub fn find_abandoned(
        conn: &mut PgConnection,
        claimed_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<CardMovement>, ApiError> {
        card_movements::table
            .filter(card_movements::status.eq(CardMovementStatus::Processing))
            .filter(card_movements::claimed_at.lt(claimed_before))
            .order(card_movements::claimed_at.asc())
            .limit(limit)
            .select(CardMovement::as_select())
            .load(conn)
            .map_err(ApiError::Database)
    }
}
