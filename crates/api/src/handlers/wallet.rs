use axum::extract::{Extension, Json, Path, Query, State};
use lendora_core::services::wallet_service::WalletService;
use lendora_core::{AppState, Claims};
use lendora_primitives::error::ApiError;
use lendora_primitives::models::{
    FundWalletRequest, InitializePaymentResponse, JournalQuery, JournalResponse,
    ReconcileResponse, VerifyPaymentRequest, WalletDto,
};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/wallet",
    responses(
        (status = 200, description = "The caller's wallet", body = WalletDto),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<WalletDto>, ApiError> {
    let user_id = claims.user_id()?;
    let wallet = WalletService::get_wallet(&state, user_id).await?;
    Ok(Json(wallet))
}

#[utoipa::path(
    get,
    path = "/api/wallet/transactions",
    params(JournalQuery),
    responses(
        (status = 200, description = "Journal entries, newest first", body = JournalResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn wallet_transactions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<JournalQuery>,
) -> Result<Json<JournalResponse>, ApiError> {
    let user_id = claims.user_id()?;
    let journal = WalletService::list_transactions(&state, user_id, query.limit).await?;
    Ok(Json(journal))
}

#[utoipa::path(
    post,
    path = "/api/wallet/fund",
    request_body = FundWalletRequest,
    responses(
        (status = 200, description = "Checkout created", body = InitializePaymentResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Reference already used")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn fund_wallet(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FundWalletRequest>,
) -> Result<Json<InitializePaymentResponse>, ApiError> {
    let user_id = claims.user_id()?;
    let response = WalletService::fund(&state, user_id, req).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/wallet/fund/verify/{reference}",
    params(
        ("reference" = String, Path, description = "Funding payment reference"),
        VerifyPaymentRequest
    ),
    responses(
        (status = 200, description = "Current settlement state", body = ReconcileResponse),
        (status = 404, description = "Unknown payment reference")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn verify_wallet_funding(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(reference): Path<String>,
    Query(query): Query<VerifyPaymentRequest>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let user_id = claims.user_id()?;
    let response =
        WalletService::verify_funding(&state, user_id, &reference, query.transaction_id.as_deref()).await?;
    Ok(Json(response))
}
