use axum::extract::{Extension, Json, Path, Query, State};
use lendora_core::repositories::audit_repository::AuditLogRepository;
use lendora_core::services::loan_service::LoanService;
use lendora_core::services::savings_service::SavingsService;
use lendora_core::services::transfer_request_service::TransferRequestService;
use lendora_core::services::wallet_service::WalletService;
use lendora_core::{AppState, Claims};
use lendora_primitives::error::ApiError;
use lendora_primitives::models::audit_log::AuditLog;
use lendora_primitives::models::{
    CreateSavingsPlanRequest, LoanDetailsResponse, LoanDto, LockWalletRequest, RejectRequest,
    SavingsPlanDto, TransferRequestDto, WalletAuditQuery, WalletAuditReport, WalletDto,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(
    post,
    path = "/api/admin/wallets/{id}/lock",
    params(("id" = Uuid, Path, description = "Wallet id")),
    request_body = LockWalletRequest,
    responses(
        (status = 200, description = "Wallet locked; debits refused", body = WalletDto),
        (status = 403, description = "Admin role required")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn lock_wallet(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(wallet_id): Path<Uuid>,
    Json(req): Json<LockWalletRequest>,
) -> Result<Json<WalletDto>, ApiError> {
    let admin_id = claims.require_admin()?;
    req.validate()?;
    Ok(Json(WalletService::lock(&state, admin_id, wallet_id, &req.reason).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/wallets/{id}/unlock",
    params(("id" = Uuid, Path, description = "Wallet id")),
    responses((status = 200, description = "Wallet unlocked", body = WalletDto)),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn unlock_wallet(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<WalletDto>, ApiError> {
    let admin_id = claims.require_admin()?;
    Ok(Json(WalletService::unlock(&state, admin_id, wallet_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/wallets/{id}/audit",
    params(("id" = Uuid, Path, description = "Wallet id"), WalletAuditQuery),
    responses((status = 200, description = "Stored balance against the journal", body = WalletAuditReport)),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn audit_wallet(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(wallet_id): Path<Uuid>,
    Query(query): Query<WalletAuditQuery>,
) -> Result<Json<WalletAuditReport>, ApiError> {
    claims.require_admin()?;
    Ok(Json(
        WalletService::audit_wallet(&state, wallet_id, query.since).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/loans/{id}/review",
    params(("id" = Uuid, Path, description = "Loan id")),
    responses(
        (status = 200, description = "Loan under review", body = LoanDto),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn review_loan(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanDto>, ApiError> {
    let admin_id = claims.require_admin()?;
    Ok(Json(LoanService::start_review(&state, admin_id, loan_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/loans/{id}/approve",
    params(("id" = Uuid, Path, description = "Loan id")),
    responses(
        (status = 200, description = "Loan approved", body = LoanDto),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn approve_loan(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanDto>, ApiError> {
    let admin_id = claims.require_admin()?;
    Ok(Json(LoanService::approve(&state, admin_id, loan_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/loans/{id}/reject",
    params(("id" = Uuid, Path, description = "Loan id")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Loan rejected", body = LoanDto),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn reject_loan(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(loan_id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<LoanDto>, ApiError> {
    let admin_id = claims.require_admin()?;
    req.validate()?;
    Ok(Json(LoanService::reject(&state, admin_id, loan_id, &req.reason).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/loans/{id}/disburse",
    params(("id" = Uuid, Path, description = "Loan id")),
    responses(
        (status = 200, description = "Principal credited and schedule generated", body = LoanDetailsResponse),
        (status = 409, description = "Not approved, or admin fee unpaid")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn disburse_loan(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanDetailsResponse>, ApiError> {
    let admin_id = claims.require_admin()?;
    Ok(Json(LoanService::disburse(&state, admin_id, loan_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/savings/plans",
    request_body = CreateSavingsPlanRequest,
    responses((status = 200, description = "Plan created", body = SavingsPlanDto)),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn create_savings_plan(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSavingsPlanRequest>,
) -> Result<Json<SavingsPlanDto>, ApiError> {
    let admin_id = claims.require_admin()?;
    Ok(Json(SavingsService::create_plan(&state, admin_id, req).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/transfer-requests/{id}/approve",
    params(("id" = Uuid, Path, description = "Transfer request id")),
    responses(
        (status = 200, description = "Approved and wallet credited", body = TransferRequestDto),
        (status = 409, description = "Already reviewed")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn approve_transfer_request(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<TransferRequestDto>, ApiError> {
    let admin_id = claims.require_admin()?;
    Ok(Json(TransferRequestService::approve(&state, admin_id, request_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/transfer-requests/{id}/reject",
    params(("id" = Uuid, Path, description = "Transfer request id")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Rejected", body = TransferRequestDto),
        (status = 409, description = "Already reviewed")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn reject_transfer_request(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<TransferRequestDto>, ApiError> {
    let admin_id = claims.require_admin()?;
    req.validate()?;
    Ok(Json(
        TransferRequestService::reject(&state, admin_id, request_id, &req.reason).await?,
    ))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditLogQuery {
    /// e.g. `payment`, `loan`, `wallet`, `card`
    pub target_type: String,
    pub target_id: String,
}

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(AuditLogQuery),
    responses((status = 200, description = "Audit trail for one target, oldest first")),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn audit_logs(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditLog>>, ApiError> {
    claims.require_admin()?;

    let mut conn = state
        .db
        .get()
        .map_err(|e| ApiError::DatabaseConnection(e.to_string()))?;

    let logs = AuditLogRepository::find_by_target(&mut conn, &query.target_type, &query.target_id)?;
    Ok(Json(logs))
}
