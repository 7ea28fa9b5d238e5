use lendora_core::services::card_service::CardService;
use lendora_core::services::loan_service::LoanService;
use lendora_core::services::reconciliation_service::ReconciliationService;
use lendora_core::services::savings_service::SavingsService;
use lendora_core::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

const DAILY_INTERVAL: Duration = Duration::from_secs(60 * 60 * 24);
const SWEEP_BATCH_SIZE: i64 = 50;

pub fn spawn_background_tasks(state: Arc<AppState>) {
    let state_clone = state.clone();
    tokio::spawn(async move {
        info!(
            every_secs = state_clone.config.pending_sweep_interval_secs,
            "Starting pending payment sweep"
        );
        sweep_pending_payments(state_clone).await;
    });

    let state_clone = state.clone();
    tokio::spawn(async move {
        info!("Starting daily overdue installment task");
        flag_overdue_installments(state_clone).await;
    });

    tokio::spawn(async move {
        info!("Starting daily savings maturity task");
        mature_savings(state).await;
    });

    info!("Background tasks spawned");
}

async fn sweep_pending_payments(state: Arc<AppState>) {
    let period = Duration::from_secs(state.config.pending_sweep_interval_secs.max(1));
    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // skip the immediate tick on startup
    interval.tick().await;

    loop {
        interval.tick().await;

        match ReconciliationService::sweep_stale(&state, SWEEP_BATCH_SIZE).await {
            Ok(report) if report.examined == 0 => debug!("Sweep: no stale pending payments"),
            Ok(report) => info!(
                examined = report.examined,
                settled = report.settled,
                failed = report.failed,
                still_pending = report.still_pending,
                errors = report.errors,
                "Sweep finished"
            ),
            Err(e) => error!("Sweep failed: {}", e),
        }

        match CardService::resume_abandoned(&state, SWEEP_BATCH_SIZE).await {
            Ok(0) => debug!("Sweep: no abandoned card movements"),
            Ok(n) => info!(settled = n, "Sweep: abandoned card movements settled"),
            Err(e) => error!("Card movement sweep failed: {}", e),
        }
    }
}

async fn flag_overdue_installments(state: Arc<AppState>) {
    let mut interval = interval(DAILY_INTERVAL);
    interval.tick().await;

    loop {
        interval.tick().await;

        match LoanService::mark_overdue(&state) {
            Ok(0) => debug!("No installments became overdue"),
            Ok(n) => info!("Marked {} installments overdue", n),
            Err(e) => error!("Overdue marking failed: {}", e),
        }
    }
}

async fn mature_savings(state: Arc<AppState>) {
    let mut interval = interval(DAILY_INTERVAL);
    interval.tick().await;

    loop {
        interval.tick().await;

        match SavingsService::mark_matured(&state) {
            Ok(0) => debug!("No savings matured"),
            Ok(n) => info!("Marked {} savings as matured", n),
            Err(e) => error!("Savings maturity task failed: {}", e),
        }
    }
}
