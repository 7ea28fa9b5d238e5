use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::SavingStatus;
use lendora_primitives::models::savings::{NewSavingsPlan, NewUserSaving, SavingsPlan, UserSaving};
use lendora_primitives::schema::{savings_plans, user_savings};
use uuid::Uuid;

pub struct SavingsRepository;

impl SavingsRepository {
    pub fn create_plan(conn: &mut PgConnection, plan: NewSavingsPlan<'_>) -> Result<SavingsPlan, ApiError> {
        diesel::insert_into(savings_plans::table)
            .values(&plan)
            .returning(SavingsPlan::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn list_active_plans(conn: &mut PgConnection) -> Result<Vec<SavingsPlan>, ApiError> {
        savings_plans::table
            .filter(savings_plans::is_active.eq(true))
            .order(savings_plans::duration_days.asc())
            .select(SavingsPlan::as_select())
            .load(conn)
            .map_err(ApiError::Database)
    }

    pub fn find_plan(conn: &mut PgConnection, plan_id: Uuid) -> Result<SavingsPlan, ApiError> {
        savings_plans::table
            .find(plan_id)
            .select(SavingsPlan::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Savings plan not found".into()).into())
    }

    pub fn create_saving(conn: &mut PgConnection, saving: NewUserSaving<'_>) -> Result<UserSaving, ApiError> {
        diesel::insert_into(user_savings::table)
            .values(&saving)
            .returning(UserSaving::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn find_by_reference(
        conn: &mut PgConnection,
        reference: &str,
    ) -> Result<Option<UserSaving>, ApiError> {
        user_savings::table
            .filter(user_savings::reference.eq(reference))
            .select(UserSaving::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    pub fn find_for_user_for_update(
        conn: &mut PgConnection,
        saving_id: Uuid,
        user_id: Uuid,
    ) -> Result<UserSaving, ApiError> {
        user_savings::table
            .find(saving_id)
            .filter(user_savings::user_id.eq(user_id))
            .select(UserSaving::as_select())
            .for_update()
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Saving not found".into()).into())
    }

    pub fn list_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<UserSaving>, ApiError> {
        user_savings::table
            .filter(user_savings::user_id.eq(user_id))
            .order(user_savings::created_at.desc())
            .select(UserSaving::as_select())
            .load(conn)
            .map_err(ApiError::Database)
    }

    pub fn mark_withdrawn(
        conn: &mut PgConnection,
        saving_id: Uuid,
        accrued_interest: i64,
        payout_amount: i64,
        withdrawn_at: DateTime<Utc>,
    ) -> Result<UserSaving, ApiError> {
        diesel::update(user_savings::table.find(saving_id))
            .set((
                user_savings::status.eq(SavingStatus::Withdrawn),
                user_savings::accrued_interest.eq(accrued_interest),
                user_savings::payout_amount.eq(Some(payout_amount)),
                user_savings::withdrawn_at.eq(Some(withdrawn_at)),
                user_savings::updated_at.eq(Utc::now()),
            ))
            .returning(UserSaving::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    /// `active -> matured` for every saving whose maturity date has passed.
    pub fn mark_matured(conn: &mut PgConnection, as_of: DateTime<Utc>) -> Result<usize, ApiError> {
        diesel::update(
            user_savings::table
                .filter(user_savings::status.eq(SavingStatus::Active))
                .filter(user_savings::maturity_date.le(as_of)),
        )
        .set((
            user_savings::status.eq(SavingStatus::Matured),
            user_savings::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .map_err(ApiError::Database)
    }
}
