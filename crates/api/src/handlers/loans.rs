use axum::extract::{Extension, Json, Path, State};
use lendora_core::services::loan_service::LoanService;
use lendora_core::{AppState, Claims};
use lendora_primitives::error::ApiError;
use lendora_primitives::models::{
    AllocationResponse, LoanApplicationRequest, LoanDetailsResponse, LoanDto,
    RepayFromWalletRequest,
};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/loans",
    request_body = LoanApplicationRequest,
    responses(
        (status = 200, description = "Application received", body = LoanDto),
        (status = 400, description = "Invalid terms")
    ),
    security(("bearerAuth" = [])),
    tag = "Loans"
)]
pub async fn apply_for_loan(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<LoanApplicationRequest>,
) -> Result<Json<LoanDto>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(LoanService::apply_for_loan(&state, user_id, req).await?))
}

#[utoipa::path(
    get,
    path = "/api/loans/{id}",
    params(("id" = Uuid, Path, description = "Loan id")),
    responses(
        (status = 200, description = "Loan with its repayment schedule", body = LoanDetailsResponse),
        (status = 404, description = "Loan not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Loans"
)]
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanDetailsResponse>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(LoanService::get_loan(&state, user_id, loan_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/loans/{id}/repay",
    params(("id" = Uuid, Path, description = "Loan id")),
    request_body = RepayFromWalletRequest,
    responses(
        (status = 200, description = "Repayment allocated", body = AllocationResponse),
        (status = 409, description = "Loan does not accept repayments"),
        (status = 422, description = "Insufficient wallet balance")
    ),
    security(("bearerAuth" = [])),
    tag = "Loans"
)]
pub async fn repay_loan(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(loan_id): Path<Uuid>,
    Json(req): Json<RepayFromWalletRequest>,
) -> Result<Json<AllocationResponse>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(LoanService::repay_from_wallet(&state, user_id, loan_id, req).await?))
}
