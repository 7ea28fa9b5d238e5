use axum::extract::{Extension, Json, Path, State};
use lendora_core::services::savings_service::SavingsService;
use lendora_core::{AppState, Claims};
use lendora_primitives::error::ApiError;
use lendora_primitives::models::{
    DepositSavingsRequest, SavingsPlanDto, SavingsWithdrawalResponse, UserSavingDto,
};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/savings/plans",
    responses((status = 200, description = "Active savings plans", body = [SavingsPlanDto])),
    security(("bearerAuth" = [])),
    tag = "Savings"
)]
pub async fn list_savings_plans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SavingsPlanDto>>, ApiError> {
    Ok(Json(SavingsService::list_plans(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/savings",
    responses((status = 200, description = "The caller's savings", body = [UserSavingDto])),
    security(("bearerAuth" = [])),
    tag = "Savings"
)]
pub async fn list_savings(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserSavingDto>>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(SavingsService::list_savings(&state, user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/savings",
    request_body = DepositSavingsRequest,
    responses(
        (status = 200, description = "Saving opened or replayed", body = UserSavingDto),
        (status = 400, description = "Below the plan minimum"),
        (status = 422, description = "Insufficient wallet balance")
    ),
    security(("bearerAuth" = [])),
    tag = "Savings"
)]
pub async fn deposit_savings(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DepositSavingsRequest>,
) -> Result<Json<UserSavingDto>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(SavingsService::deposit(&state, user_id, req).await?))
}

#[utoipa::path(
    post,
    path = "/api/savings/{id}/withdraw",
    params(("id" = Uuid, Path, description = "Saving id")),
    responses(
        (status = 200, description = "Payout credited to the wallet", body = SavingsWithdrawalResponse),
        (status = 404, description = "Saving not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Savings"
)]
pub async fn withdraw_savings(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(saving_id): Path<Uuid>,
) -> Result<Json<SavingsWithdrawalResponse>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(SavingsService::withdraw(&state, user_id, saving_id).await?))
}
