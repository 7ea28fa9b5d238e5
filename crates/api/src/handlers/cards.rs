use axum::extract::{Extension, Json, Path, State};
use lendora_core::services::card_service::CardService;
use lendora_core::{AppState, Claims};
use lendora_primitives::error::ApiError;
use lendora_primitives::models::{
    CardAmountRequest, CardMovementResponse, IssueCardRequest, VirtualCardDto,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(
    post,
    path = "/api/cards",
    request_body = IssueCardRequest,
    responses(
        (status = 200, description = "Card issued", body = VirtualCardDto),
        (status = 400, description = "Invalid input or issuer not configured"),
        (status = 502, description = "Issuer refused the card")
    ),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn issue_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<IssueCardRequest>,
) -> Result<Json<VirtualCardDto>, ApiError> {
    let user_id = claims.user_id()?;
    let card = CardService::issue_card(&state, user_id, req).await?;
    Ok(Json(card))
}

#[utoipa::path(
    get,
    path = "/api/cards",
    responses(
        (status = 200, description = "The caller's cards", body = [VirtualCardDto])
    ),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<VirtualCardDto>>, ApiError> {
    let user_id = claims.user_id()?;
    let cards = CardService::list_cards(&state, user_id).await?;
    Ok(Json(cards))
}

#[utoipa::path(
    post,
    path = "/api/cards/{id}/fund",
    params(("id" = Uuid, Path, description = "Card id")),
    request_body = CardAmountRequest,
    responses(
        (status = 200, description = "Card funded or replayed", body = CardMovementResponse),
        (status = 422, description = "Insufficient wallet balance"),
        (status = 502, description = "Issuer failed; wallet debit reversed")
    ),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn fund_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(card_id): Path<Uuid>,
    Json(req): Json<CardAmountRequest>,
) -> Result<Json<CardMovementResponse>, ApiError> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let movement = CardService::fund(&state, user_id, card_id, req.amount, &req.reference).await?;
    Ok(Json(movement))
}

#[utoipa::path(
    post,
    path = "/api/cards/{id}/withdraw",
    params(("id" = Uuid, Path, description = "Card id")),
    request_body = CardAmountRequest,
    responses(
        (status = 200, description = "Funds returned to wallet", body = CardMovementResponse),
        (status = 422, description = "Insufficient card balance"),
        (status = 502, description = "Issuer failed; card debit reversed")
    ),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn withdraw_from_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(card_id): Path<Uuid>,
    Json(req): Json<CardAmountRequest>,
) -> Result<Json<CardMovementResponse>, ApiError> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let movement = CardService::withdraw(&state, user_id, card_id, req.amount, &req.reference).await?;
    Ok(Json(movement))
}

#[utoipa::path(
    post,
    path = "/api/cards/{id}/block",
    params(("id" = Uuid, Path, description = "Card id")),
    responses((status = 200, description = "Card blocked", body = VirtualCardDto)),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn block_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<VirtualCardDto>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(CardService::block(&state, user_id, card_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/cards/{id}/unblock",
    params(("id" = Uuid, Path, description = "Card id")),
    responses((status = 200, description = "Card unblocked", body = VirtualCardDto)),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn unblock_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<VirtualCardDto>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(CardService::unblock(&state, user_id, card_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/cards/{id}/terminate",
    params(("id" = Uuid, Path, description = "Card id")),
    responses(
        (status = 200, description = "Remaining balance returned and card terminated", body = VirtualCardDto)
    ),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn terminate_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<VirtualCardDto>, ApiError> {
    let user_id = claims.user_id()?;
    Ok(Json(CardService::terminate(&state, user_id, card_id).await?))
}
