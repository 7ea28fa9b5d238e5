use crate::config::swagger_config::ApiDoc;
use crate::handlers::{
    admin::{
        approve_loan, approve_transfer_request, audit_logs, audit_wallet, create_savings_plan,
        disburse_loan, lock_wallet, reject_loan, reject_transfer_request, review_loan,
        unlock_wallet,
    },
    cards::{
        block_card, fund_card, issue_card, list_cards, terminate_card, unblock_card,
        withdraw_from_card,
    },
    health::health_check,
    loans::{apply_for_loan, get_loan, repay_loan},
    payments::{initialize_payment, retry_card_funding, verify_payment},
    savings::{deposit_savings, list_savings, list_savings_plans, withdraw_savings},
    transfer_requests::submit_transfer_request,
    wallet::{fund_wallet, get_wallet, verify_wallet_funding, wallet_transactions},
    webhooks::{flutterwave_webhook, paystack_webhook},
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use axum_prometheus::{metrics_exporter_prometheus::PrometheusHandle, PrometheusMetricLayer};
use lendora_core::{AppState, SecurityConfig};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn create_router(
    state: Arc<AppState>,
    metric_layer: PrometheusMetricLayer<'static>,
    metric_handle: PrometheusHandle,
) -> Router {
    let public_router = create_public_routers(metric_handle);
    let protected_router = create_secured_routers(&state);
    let admin_router = create_admin_routers(&state);

    let mut router = Router::new()
        .merge(public_router)
        .merge(protected_router)
        .merge(admin_router)
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
        .layer(metric_layer)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    // the peer-ip key extractor needs ConnectInfo, which test servers do not provide
    if state.config.rate_limit_enabled {
        match GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(10)
            .finish()
        {
            Some(conf) => router = router.layer(GovernorLayer::new(Arc::new(conf))),
            None => warn!("Rate limiter configuration rejected; continuing without it"),
        }
    }

    router.with_state(state)
}

fn create_secured_routers(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/payments/initialize", post(initialize_payment))
        .route("/api/payments/verify/{reference}", post(verify_payment))
        .route(
            "/api/payments/{reference}/card-funding/retry",
            post(retry_card_funding),
        )
        .route("/api/wallet", get(get_wallet))
        .route("/api/wallet/transactions", get(wallet_transactions))
        .route("/api/wallet/fund", post(fund_wallet))
        .route("/api/wallet/fund/verify/{reference}", post(verify_wallet_funding))
        .route("/api/cards", post(issue_card).get(list_cards))
        .route("/api/cards/{id}/fund", post(fund_card))
        .route("/api/cards/{id}/withdraw", post(withdraw_from_card))
        .route("/api/cards/{id}/block", post(block_card))
        .route("/api/cards/{id}/unblock", post(unblock_card))
        .route("/api/cards/{id}/terminate", post(terminate_card))
        .route("/api/savings/plans", get(list_savings_plans))
        .route("/api/savings", post(deposit_savings).get(list_savings))
        .route("/api/savings/{id}/withdraw", post(withdraw_savings))
        .route("/api/loans", post(apply_for_loan))
        .route("/api/loans/{id}", get(get_loan))
        .route("/api/loans/{id}/repay", post(repay_loan))
        .route("/api/transfer-requests", post(submit_transfer_request))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            SecurityConfig::auth_middleware,
        ))
}

fn create_admin_routers(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/wallets/{id}/lock", post(lock_wallet))
        .route("/api/admin/wallets/{id}/unlock", post(unlock_wallet))
        .route("/api/admin/wallets/{id}/audit", get(audit_wallet))
        .route("/api/admin/loans/{id}/review", post(review_loan))
        .route("/api/admin/loans/{id}/approve", post(approve_loan))
        .route("/api/admin/loans/{id}/reject", post(reject_loan))
        .route("/api/admin/loans/{id}/disburse", post(disburse_loan))
        .route("/api/admin/savings/plans", post(create_savings_plan))
        .route(
            "/api/admin/transfer-requests/{id}/approve",
            post(approve_transfer_request),
        )
        .route(
            "/api/admin/transfer-requests/{id}/reject",
            post(reject_transfer_request),
        )
        .route("/api/admin/audit-logs", get(audit_logs))
        // outermost layer runs first: authenticate, then check the role
        .layer(middleware::from_fn(SecurityConfig::admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            SecurityConfig::auth_middleware,
        ))
}

fn create_public_routers(metric_handle: PrometheusHandle) -> Router<Arc<AppState>> {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(health_check))
        .route("/api/webhooks/paystack", post(paystack_webhook))
        .route("/api/webhooks/flutterwave", post(flutterwave_webhook))
        .route(
            "/metrics",
            get(move || std::future::ready(metric_handle.render())),
        )
}
