use crate::app_state::AppState;
use crate::repositories::transfer_request_repository::TransferRequestRepository;
use crate::services::audit_service::AuditService;
use crate::services::ledger_service::{LedgerPosting, LedgerService};
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::{
    EntryCategory, LedgerSource, TransferRequestStatus,
};
use lendora_primitives::models::transfer_request::{NewTransferRequest, TransferRequest};
use lendora_primitives::models::transfer_request_dto::{SubmitTransferRequest, TransferRequestDto};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

pub fn transfer_request_reference(request_id: Uuid) -> String {
    format!("transfer-request:{}", request_id)
}

fn ensure_pending(request: &TransferRequest) -> Result<(), LedgerError> {
    if request.status == TransferRequestStatus::Pending {
        Ok(())
    } else {
        Err(LedgerError::InvalidState(format!(
            "Transfer request already {}",
            request.status
        )))
    }
}

pub struct TransferRequestService;

impl TransferRequestService {
    pub async fn submit(
        state: &AppState,
        user_id: Uuid,
        req: SubmitTransferRequest,
    ) -> Result<TransferRequestDto, ApiError> {
        req.validate()?;

        let mut conn = state.db.get()?;
        let request = TransferRequestRepository::create(
            &mut conn,
            NewTransferRequest {
                user_id,
                amount: req.amount,
                currency: state.config.default_currency,
                bank_reference: &req.bank_reference,
                status: TransferRequestStatus::Pending,
            },
        )?;

        info!(request_id = %request.id, amount = request.amount, "transfers.submit: awaiting review");
        Ok(TransferRequestDto::from(request))
    }

    /// Credits the claimed amount once. A second approval is refused rather
    /// than posted again.
    pub async fn approve(
        state: &AppState,
        admin_id: Uuid,
        request_id: Uuid,
    ) -> Result<TransferRequestDto, ApiError> {
        let mut conn = state.db.get()?;

        let request = conn.transaction::<_, ApiError, _>(|conn| {
            let request = TransferRequestRepository::find_by_id_for_update(conn, request_id)?;
            ensure_pending(&request)?;

            let wallet = LedgerService::ensure_wallet(conn, request.user_id, request.currency)?;
            let reference = transfer_request_reference(request.id);
            LedgerService::credit(
                conn,
                LedgerPosting::new(wallet.id, request.amount, EntryCategory::ManualTransfer, &reference)
                    .source(LedgerSource::Internal, Some(&request.bank_reference))
                    .description("Approved bank transfer"),
            )?;

            let request = TransferRequestRepository::mark_reviewed(
                conn,
                request.id,
                TransferRequestStatus::Approved,
                admin_id,
                None,
            )?;
            AuditService::record(
                conn,
                Some(admin_id),
                "transfer_request.approved",
                "transfer_request",
                &request.id.to_string(),
                json!({ "amount": request.amount, "user_id": request.user_id }),
            )?;
            Ok(request)
        })?;

        info!(%request_id, "transfers.approve: wallet credited");
        Ok(TransferRequestDto::from(request))
    }

    pub async fn reject(
        state: &AppState,
        admin_id: Uuid,
        request_id: Uuid,
        reason: &str,
    ) -> Result<TransferRequestDto, ApiError> {
        let mut conn = state.db.get()?;

        let request = conn.transaction::<_, ApiError, _>(|conn| {
            let request = TransferRequestRepository::find_by_id_for_update(conn, request_id)?;
            ensure_pending(&request)?;

            let request = TransferRequestRepository::mark_reviewed(
                conn,
                request.id,
                TransferRequestStatus::Rejected,
                admin_id,
                Some(reason),
            )?;
            AuditService::record(
                conn,
                Some(admin_id),
                "transfer_request.rejected",
                "transfer_request",
                &request.id.to_string(),
                json!({ "reason": reason }),
            )?;
            Ok(request)
        })?;

        Ok(TransferRequestDto::from(request))
    }
}
