use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::PaymentStatus;
use lendora_primitives::models::payment::{NewPayment, Payment};
use lendora_primitives::schema::payments;
use uuid::Uuid;

pub struct PaymentRepository;

impl PaymentRepository {
    pub fn create(conn: &mut PgConnection, new_payment: NewPayment<'_>) -> Result<Payment, ApiError> {
        diesel::insert_into(payments::table)
            .values(&new_payment)
            .returning(Payment::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn find_by_reference(
        conn: &mut PgConnection,
        reference: &str,
    ) -> Result<Option<Payment>, ApiError> {
        payments::table
            .filter(payments::reference.eq(reference))
            .select(Payment::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    pub fn find_by_reference_for_update(
        conn: &mut PgConnection,
        reference: &str,
    ) -> Result<Payment, ApiError> {
        payments::table
            .filter(payments::reference.eq(reference))
            .select(Payment::as_select())
            .for_update()
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::PaymentNotFound(reference.to_string()).into())
    }

    pub fn set_authorization(
        conn: &mut PgConnection,
        payment_id: Uuid,
        authorization_url: &str,
        gateway_reference: Option<&str>,
    ) -> Result<Payment, ApiError> {
        diesel::update(payments::table.find(payment_id))
            .set((
                payments::authorization_url.eq(authorization_url),
                payments::gateway_reference.eq(gateway_reference),
                payments::updated_at.eq(Utc::now()),
            ))
            .returning(Payment::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    /// `pending -> success`. The status filter makes a second call a no-op.
    pub fn mark_success(
        conn: &mut PgConnection,
        payment_id: Uuid,
        gateway_reference: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> Result<Payment, ApiError> {
        diesel::update(
            payments::table
                .find(payment_id)
                .filter(payments::status.eq(PaymentStatus::Pending)),
        )
        .set((
            payments::status.eq(PaymentStatus::Success),
            payments::gateway_reference.eq(gateway_reference),
            payments::paid_at.eq(Some(paid_at)),
            payments::flagged_for_review.eq(false),
            payments::updated_at.eq(Utc::now()),
        ))
        .returning(Payment::as_returning())
        .get_result(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| LedgerError::InvalidState("Payment is no longer pending".into()).into())
    }

    /// `pending -> failed`.
    pub fn mark_failed(
        conn: &mut PgConnection,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<Option<Payment>, ApiError> {
        diesel::update(
            payments::table
                .find(payment_id)
                .filter(payments::status.eq(PaymentStatus::Pending)),
        )
        .set((
            payments::status.eq(PaymentStatus::Failed),
            payments::failure_reason.eq(reason),
            payments::updated_at.eq(Utc::now()),
        ))
        .returning(Payment::as_returning())
        .get_result(conn)
        .optional()
        .map_err(ApiError::Database)
    }

    /// Parks a pending payment for manual review; the status is left alone.
    pub fn flag_for_review(
        conn: &mut PgConnection,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<(), ApiError> {
        diesel::update(
            payments::table
                .find(payment_id)
                .filter(payments::status.eq(PaymentStatus::Pending)),
        )
        .set((
            payments::flagged_for_review.eq(true),
            payments::failure_reason.eq(reason),
            payments::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .map_err(ApiError::Database)?;
        Ok(())
    }

    /// Pending, unflagged payments created before `older_than`, oldest first.
    pub fn find_stale_pending(
        conn: &mut PgConnection,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Payment>, ApiError> {
        payments::table
            .filter(payments::status.eq(PaymentStatus::Pending))
            .filter(payments::flagged_for_review.eq(false))
            .filter(payments::created_at.lt(older_than))
            .order(payments::created_at.asc())
            .limit(limit)
            .select(Payment::as_select())
            .load(conn)
            .map_err(ApiError::Database)
    }
}
