use axum::extract::{Extension, Json, Path, Query, State};
use lendora_core::services::payment_service::PaymentService;
use lendora_core::services::reconciliation_service::ReconciliationService;
use lendora_core::{AppState, Claims};
use lendora_primitives::error::ApiError;
use lendora_primitives::models::{
    CardMovementResponse, InitializePaymentRequest, InitializePaymentResponse, ReconcileResponse,
    VerifyPaymentRequest,
};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/payments/initialize",
    request_body = InitializePaymentRequest,
    responses(
        (status = 200, description = "Checkout created or replayed", body = InitializePaymentResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Reference already used for a different payment"),
        (status = 503, description = "Gateway unavailable; retry with the same reference")
    ),
    security(("bearerAuth" = [])),
    tag = "Payments"
)]
pub async fn initialize_payment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InitializePaymentRequest>,
) -> Result<Json<InitializePaymentResponse>, ApiError> {
    let user_id = claims.user_id()?;
    let response = PaymentService::initialize(&state, user_id, req).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/payments/verify/{reference}",
    params(
        ("reference" = String, Path, description = "Payment reference"),
        VerifyPaymentRequest
    ),
    responses(
        (status = 200, description = "Current settlement state", body = ReconcileResponse),
        (status = 404, description = "Unknown payment reference"),
        (status = 422, description = "Gateway amount does not match; flagged for review"),
        (status = 503, description = "Gateway unavailable")
    ),
    security(("bearerAuth" = [])),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(reference): Path<String>,
    Query(query): Query<VerifyPaymentRequest>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let user_id = claims.user_id()?;
    let response = ReconciliationService::reconcile_for_user(
        &state,
        user_id,
        &reference,
        query.transaction_id.as_deref(),
    )
    .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/payments/{reference}/card-funding/retry",
    params(("reference" = String, Path, description = "Card-funding payment reference")),
    responses(
        (status = 200, description = "Card leg completed or already completed", body = CardMovementResponse),
        (status = 404, description = "Unknown payment reference"),
        (status = 409, description = "Payment not settled, not a card funding, or a retry is in progress"),
        (status = 502, description = "Card issuer refused; funds stay in the wallet")
    ),
    security(("bearerAuth" = [])),
    tag = "Payments"
)]
pub async fn retry_card_funding(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(reference): Path<String>,
) -> Result<Json<CardMovementResponse>, ApiError> {
    let user_id = claims.user_id()?;
    let response = ReconciliationService::retry_card_bridge(&state, user_id, &reference).await?;
    Ok(Json(response))
}
