use crate::models::entities::enum_types::SavingStatus;
use chrono::{DateTime, Utc};
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

/// Admin-authored savings product.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::savings_plans)]
pub struct SavingsPlan {
    pub id: Uuid,
    pub name: String,
    pub interest_rate_bps: i32,
    pub duration_days: i32,
    pub early_withdrawal_penalty_bps: i32,
    pub min_amount: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::savings_plans)]
pub struct NewSavingsPlan<'a> {
    pub name: &'a str,
    pub interest_rate_bps: i32,
    pub duration_days: i32,
    pub early_withdrawal_penalty_bps: i32,
    pub min_amount: i64,
}

/// A user's subscription to a plan.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(table_name = crate::schema::user_savings)]
#[diesel(belongs_to(SavingsPlan, foreign_key = plan_id))]
pub struct UserSaving {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub reference: String,
    pub amount: i64,
    pub accrued_interest: i64,
    pub started_at: DateTime<Utc>,
    pub maturity_date: DateTime<Utc>,
    pub status: SavingStatus,
    pub payout_amount: Option<i64>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::user_savings)]
pub struct NewUserSaving<'a> {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub reference: &'a str,
    pub amount: i64,
    pub started_at: DateTime<Utc>,
    pub maturity_date: DateTime<Utc>,
    pub status: SavingStatus,
}
