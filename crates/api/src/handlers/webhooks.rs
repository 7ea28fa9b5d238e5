use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use lendora_core::services::webhook_service::WebhookService;
use lendora_core::AppState;
use lendora_primitives::error::ApiError;
use lendora_primitives::models::enum_types::GatewayProvider;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/webhooks/paystack",
    request_body = lendora_primitives::models::dtos::providers::paystack::PaystackWebhook,
    responses(
        (status = 200, description = "Webhook processed"),
        (status = 400, description = "Invalid signature or payload"),
        (status = 503, description = "Temporary failure; provider should retry")
    ),
    tag = "Webhooks"
)]
pub async fn paystack_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    WebhookService::handle(&state, GatewayProvider::Paystack, &headers, &body).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/webhooks/flutterwave",
    request_body = lendora_primitives::models::dtos::providers::flutterwave::FlutterwaveWebhook,
    responses(
        (status = 200, description = "Webhook processed"),
        (status = 400, description = "Invalid signature or payload"),
        (status = 503, description = "Temporary failure; provider should retry")
    ),
    tag = "Webhooks"
)]
pub async fn flutterwave_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    WebhookService::handle(&state, GatewayProvider::Flutterwave, &headers, &body).await?;
    Ok(StatusCode::OK)
}
