use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::prelude::*;
use lendora_core::AppState;
use lendora_primitives::models::HealthStatus;
use std::sync::Arc;
use tracing::error;

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    summary = "Health check endpoint",
    description = "Reports database reachability and the configured payment gateways. \
                   Public; no authentication required.",
    operation_id = "healthCheck",
    responses(
        (status = 200, description = "Service is healthy", body = HealthStatus),
        (status = 503, description = "Database unreachable", body = HealthStatus),
    ),
    security(()),
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthStatus>) {
    let database = match state.db.get() {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => "up",
            Err(e) => {
                error!("Health check DB query failed: {}", e);
                "down"
            }
        },
        Err(e) => {
            error!("Health check DB connection failed: {}", e);
            "down"
        }
    };

    let status = if database == "up" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let gateways = state
        .gateways
        .configured()
        .into_iter()
        .map(|provider| provider.to_string())
        .collect();

    (
        status,
        Json(HealthStatus {
            status: status.to_string(),
            database: database.to_string(),
            gateways,
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}
