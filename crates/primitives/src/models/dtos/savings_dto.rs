use crate::models::entities::enum_types::SavingStatus;
use crate::models::entities::savings::{SavingsPlan, UserSaving};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSavingsPlanRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(range(min = 0, max = 10_000))]
    pub interest_rate_bps: i32,
    #[validate(range(min = 1, max = 3650))]
    pub duration_days: i32,
    #[validate(range(min = 0, max = 10_000))]
    pub early_withdrawal_penalty_bps: i32,
    #[validate(range(min = 1))]
    pub min_amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SavingsPlanDto {
    pub id: Uuid,
    pub name: String,
    pub interest_rate_bps: i32,
    pub duration_days: i32,
    pub early_withdrawal_penalty_bps: i32,
    pub min_amount: i64,
    pub is_active: bool,
}

impl From<SavingsPlan> for SavingsPlanDto {
    fn from(p: SavingsPlan) -> Self {
        Self {
            id: p.id,
            name: p.name,
            interest_rate_bps: p.interest_rate_bps,
            duration_days: p.duration_days,
            early_withdrawal_penalty_bps: p.early_withdrawal_penalty_bps,
            min_amount: p.min_amount,
            is_active: p.is_active,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DepositSavingsRequest {
    pub plan_id: Uuid,
    #[validate(range(min = 1))]
    pub amount: i64,
    #[validate(length(min = 8, max = 64))]
    pub reference: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSavingDto {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub reference: String,
    pub amount: i64,
    pub accrued_interest: i64,
    pub started_at: DateTime<Utc>,
    pub maturity_date: DateTime<Utc>,
    pub status: SavingStatus,
    pub payout_amount: Option<i64>,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

impl From<UserSaving> for UserSavingDto {
    fn from(s: UserSaving) -> Self {
        Self {
            id: s.id,
            plan_id: s.plan_id,
            reference: s.reference,
            amount: s.amount,
            accrued_interest: s.accrued_interest,
            started_at: s.started_at,
            maturity_date: s.maturity_date,
            status: s.status,
            payout_amount: s.payout_amount,
            withdrawn_at: s.withdrawn_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SavingsWithdrawalResponse {
    pub saving: UserSavingDto,
    pub interest: i64,
    pub penalty: i64,
    pub payout: i64,
}
