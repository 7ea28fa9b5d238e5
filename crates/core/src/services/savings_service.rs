use crate::app_state::AppState;
use crate::repositories::savings_repository::SavingsRepository;
use crate::services::audit_service::AuditService;
use crate::services::ledger_service::{LedgerPosting, LedgerService};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::{EntryCategory, SavingStatus};
use lendora_primitives::models::savings::{NewSavingsPlan, NewUserSaving, UserSaving};
use lendora_primitives::models::savings_dto::{
    CreateSavingsPlanRequest, DepositSavingsRequest, SavingsPlanDto, SavingsWithdrawalResponse,
    UserSavingDto,
};
use lendora_primitives::money::{apply_bps, narrow, BPS_DENOMINATOR};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

const DAYS_PER_YEAR: i128 = 365;

/// Simple interest on whole days held, capped at maturity:
/// `amount * rate_bps * days / (10_000 * 365)`, floored.
pub fn calculate_interest(
    amount: i64,
    rate_bps: i32,
    started_at: DateTime<Utc>,
    as_of: DateTime<Utc>,
    maturity_date: DateTime<Utc>,
) -> Result<i64, LedgerError> {
    let end = as_of.min(maturity_date);
    let days = i128::from((end - started_at).num_days().max(0));

    narrow(
        i128::from(amount) * i128::from(rate_bps) * days
            / (i128::from(BPS_DENOMINATOR) * DAYS_PER_YEAR),
    )
}

/// Penalty on the gross payout when withdrawn before maturity, zero after.
pub fn early_withdrawal_penalty(
    gross: i64,
    penalty_bps: i32,
    as_of: DateTime<Utc>,
    maturity_date: DateTime<Utc>,
) -> Result<i64, LedgerError> {
    if as_of >= maturity_date {
        return Ok(0);
    }
    apply_bps(gross, i64::from(penalty_bps))
}

pub fn savings_withdrawal_reference(saving_id: Uuid) -> String {
    format!("savings-withdrawal:{}", saving_id)
}

pub struct SavingsService;

impl SavingsService {
    pub async fn create_plan(
        state: &AppState,
        admin_id: Uuid,
        req: CreateSavingsPlanRequest,
    ) -> Result<SavingsPlanDto, ApiError> {
        req.validate()?;

        let mut conn = state.db.get()?;
        let plan = conn.transaction::<_, ApiError, _>(|conn| {
            let plan = SavingsRepository::create_plan(
                conn,
                NewSavingsPlan {
                    name: &req.name,
                    interest_rate_bps: req.interest_rate_bps,
                    duration_days: req.duration_days,
                    early_withdrawal_penalty_bps: req.early_withdrawal_penalty_bps,
                    min_amount: req.min_amount,
                },
            )?;
            AuditService::record(
                conn,
                Some(admin_id),
                "savings.plan_created",
                "savings_plan",
                &plan.id.to_string(),
                json!({ "name": plan.name, "interest_rate_bps": plan.interest_rate_bps }),
            )?;
            Ok(plan)
        })?;

        Ok(SavingsPlanDto::from(plan))
    }

    pub async fn list_plans(state: &AppState) -> Result<Vec<SavingsPlanDto>, ApiError> {
        let mut conn = state.db.get()?;
        let plans = SavingsRepository::list_active_plans(&mut conn)?;
        Ok(plans.into_iter().map(SavingsPlanDto::from).collect())
    }

    pub async fn list_savings(state: &AppState, user_id: Uuid) -> Result<Vec<UserSavingDto>, ApiError> {
        let mut conn = state.db.get()?;
        let savings = SavingsRepository::list_for_user(&mut conn, user_id)?;
        Ok(savings.into_iter().map(UserSavingDto::from).collect())
    }

    /// Moves money from the wallet into a plan. The saving row and the
    /// journal entry share the request reference, so a repeat returns the
    /// first deposit.
    pub async fn deposit(
        state: &AppState,
        user_id: Uuid,
        req: DepositSavingsRequest,
    ) -> Result<UserSavingDto, ApiError> {
        req.validate()?;

        let mut conn = state.db.get()?;
        let saving = conn.transaction::<_, ApiError, _>(|conn| {
            if let Some(existing) = SavingsRepository::find_by_reference(conn, &req.reference)? {
                if existing.user_id != user_id || existing.plan_id != req.plan_id || existing.amount != req.amount {
                    return Err(LedgerError::DuplicateReference(req.reference.clone()).into());
                }
                return Ok(existing);
            }

            let plan = SavingsRepository::find_plan(conn, req.plan_id)?;
            if !plan.is_active {
                return Err(LedgerError::InvalidState("Savings plan is closed".into()).into());
            }
            if req.amount < plan.min_amount {
                return Err(ApiError::BadRequest(format!(
                    "Minimum deposit for this plan is {}",
                    plan.min_amount
                )));
            }

            let wallet = LedgerService::ensure_wallet(conn, user_id, state.config.default_currency)?;
            LedgerService::debit(
                conn,
                LedgerPosting::new(wallet.id, req.amount, EntryCategory::SavingsDeposit, &req.reference)
                    .description("Savings deposit")
                    .metadata(json!({ "plan_id": plan.id })),
            )?;

            let started_at = Utc::now();
            SavingsRepository::create_saving(
                conn,
                NewUserSaving {
                    user_id,
                    plan_id: plan.id,
                    reference: &req.reference,
                    amount: req.amount,
                    started_at,
                    maturity_date: started_at + Duration::days(plan.duration_days as i64),
                    status: SavingStatus::Active,
                },
            )
        })?;

        info!(saving_id = %saving.id, amount = saving.amount, "savings.deposit: saving opened");
        Ok(UserSavingDto::from(saving))
    }

    /// Pays principal plus accrued interest back to the wallet, less the
    /// early-withdrawal penalty before maturity. Withdrawing twice returns
    /// the recorded payout.
    pub async fn withdraw(
        state: &AppState,
        user_id: Uuid,
        saving_id: Uuid,
    ) -> Result<SavingsWithdrawalResponse, ApiError> {
        let mut conn = state.db.get()?;

        let response = conn.transaction::<_, ApiError, _>(|conn| {
            let saving = SavingsRepository::find_for_user_for_update(conn, saving_id, user_id)?;

            if saving.status == SavingStatus::Withdrawn {
                return Ok(withdrawn_response(saving));
            }

            let plan = SavingsRepository::find_plan(conn, saving.plan_id)?;
            let now = Utc::now();

            let interest = calculate_interest(
                saving.amount,
                plan.interest_rate_bps,
                saving.started_at,
                now,
                saving.maturity_date,
            )?;
            let gross = saving
                .amount
                .checked_add(interest)
                .ok_or(LedgerError::InvalidAmount)?;
            let penalty = early_withdrawal_penalty(
                gross,
                plan.early_withdrawal_penalty_bps,
                now,
                saving.maturity_date,
            )?;
            let payout = gross - penalty;

            // A penalty can consume the whole payout; the saving still closes.
            if payout > 0 {
                let wallet =
                    LedgerService::ensure_wallet(conn, user_id, state.config.default_currency)?;
                let reference = savings_withdrawal_reference(saving.id);
                LedgerService::credit(
                    conn,
                    LedgerPosting::new(wallet.id, payout, EntryCategory::SavingsWithdrawal, &reference)
                        .description("Savings withdrawal")
                        .metadata(json!({ "saving_id": saving.id, "interest": interest, "penalty": penalty })),
                )?;
            }

            let saving = SavingsRepository::mark_withdrawn(conn, saving.id, interest, payout, now)?;

            Ok(SavingsWithdrawalResponse {
                saving: UserSavingDto::from(saving),
                interest,
                penalty,
                payout,
            })
        })?;

        info!(%saving_id, payout = response.payout, "savings.withdraw: paid out");
        Ok(response)
    }

    pub fn mark_matured(state: &AppState) -> Result<usize, ApiError> {
        let mut conn = state.db.get()?;
        let count = SavingsRepository::mark_matured(&mut conn, Utc::now())?;
        if count > 0 {
            info!(count, "savings: plans matured");
        }
        Ok(count)
    }
}

fn withdrawn_response(saving: UserSaving) -> SavingsWithdrawalResponse {
    let payout = saving.payout_amount.unwrap_or_default();
    let interest = saving.accrued_interest;
    let penalty = saving.amount + interest - payout;

    SavingsWithdrawalResponse {
        saving: UserSavingDto::from(saving),
        interest,
        penalty,
        payout,
    }
}
