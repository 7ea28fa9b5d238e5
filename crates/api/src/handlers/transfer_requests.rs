use axum::extract::{Extension, Json, State};
use lendora_core::services::transfer_request_service::TransferRequestService;
use lendora_core::{AppState, Claims};
use lendora_primitives::error::ApiError;
use lendora_primitives::models::{SubmitTransferRequest, TransferRequestDto};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/transfer-requests",
    request_body = SubmitTransferRequest,
    responses(
        (status = 200, description = "Submitted for review", body = TransferRequestDto),
        (status = 400, description = "Invalid input")
    ),
    security(("bearerAuth" = [])),
    tag = "Transfers"
)]
pub async fn submit_transfer_request(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitTransferRequest>,
) -> Result<Json<TransferRequestDto>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(TransferRequestService::submit(&state, user_id, req).await?))
}
