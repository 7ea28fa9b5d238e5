use axum::Router;
use axum_prometheus::{metrics_exporter_prometheus::PrometheusHandle, PrometheusMetricLayer};
use eyre::Report;
use http::HeaderValue;
use lendora_core::AppState;
use std::env;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub fn build_cors() -> Result<CorsLayer, Report> {
    let origins = env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into());

    let allowed_origins = origins
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| eyre::eyre!("Invalid CORS origin: {}", e))?;

    Ok(CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(allowed_origins))
}

pub fn load_env() {
    if dotenvy::dotenv().is_ok() {
        info!("Loaded .env file");
    } else {
        info!("No .env file found, using system environment");
    }
}

pub fn migrations_enabled() -> bool {
    env::var("RUN_MIGRATIONS")
        .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"))
        .unwrap_or(true)
}

pub fn build_router(
    state: Arc<AppState>,
    metric_layer: PrometheusMetricLayer<'static>,
    metric_handle: PrometheusHandle,
) -> Result<Router, Report> {
    let cors = build_cors()?;

    Ok(lendora_api::app::create_router(state, metric_layer, metric_handle).layer(cors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn cors_rejects_malformed_origin() {
        env::set_var("CORS_ORIGINS", "http://ok.example, bad\norigin");
        assert!(build_cors().is_err());

        env::set_var("CORS_ORIGINS", "http://a.example, http://b.example");
        assert!(build_cors().is_ok());
        env::remove_var("CORS_ORIGINS");
    }

    #[test]
    #[serial]
    fn migrations_can_be_switched_off() {
        env::remove_var("RUN_MIGRATIONS");
        assert!(migrations_enabled());

        env::set_var("RUN_MIGRATIONS", "false");
        assert!(!migrations_enabled());

        env::set_var("RUN_MIGRATIONS", "true");
        assert!(migrations_enabled());
        env::remove_var("RUN_MIGRATIONS");
    }
}
