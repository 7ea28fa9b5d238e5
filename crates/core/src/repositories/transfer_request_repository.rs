use chrono::Utc;
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::TransferRequestStatus;
use lendora_primitives::models::transfer_request::{NewTransferRequest, TransferRequest};
use lendora_primitives::schema::transfer_requests;
use uuid::Uuid;

pub struct TransferRequestRepository;

impl TransferRequestRepository {
    pub fn create(
        conn: &mut PgConnection,
        request: NewTransferRequest<'_>,
    ) -> Result<TransferRequest, ApiError> {
        diesel::insert_into(transfer_requests::table)
            .values(&request)
            .returning(TransferRequest::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn find_by_id_for_update(
        conn: &mut PgConnection,
        request_id: Uuid,
    ) -> Result<TransferRequest, ApiError> {
        transfer_requests::table
            .find(request_id)
            .select(TransferRequest::as_select())
            .for_update()
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Transfer request not found".into()).into())
    }

    pub fn mark_reviewed(
        conn: &mut PgConnection,
        request_id: Uuid,
        status: TransferRequestStatus,
        reviewer: Uuid,
        rejection_reason: Option<&str>,
    ) -> Result<TransferRequest, ApiError> {
        let now = Utc::now();
        diesel::update(transfer_requests::table.find(request_id))
            .set((
                transfer_requests::status.eq(status),
                transfer_requests::reviewed_by.eq(Some(reviewer)),
                transfer_requests::reviewed_at.eq(Some(now)),
                transfer_requests::rejection_reason.eq(rejection_reason),
                transfer_requests::updated_at.eq(now),
            ))
            .returning(TransferRequest::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }
}
