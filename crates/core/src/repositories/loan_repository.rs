use chrono::Utc;
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::LoanStatus;
use lendora_primitives::models::loan::{Loan, NewLoan};
use lendora_primitives::schema::loans;
use uuid::Uuid;

pub struct LoanRepository;

impl LoanRepository {
    pub fn create(conn: &mut PgConnection, new_loan: NewLoan) -> Result<Loan, ApiError> {
        diesel::insert_into(loans::table)
            .values(&new_loan)
            .returning(Loan::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn find_by_id(conn: &mut PgConnection, loan_id: Uuid) -> Result<Loan, ApiError> {
        loans::table
            .find(loan_id)
            .select(Loan::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Loan not found".into()).into())
    }

    pub fn find_by_id_for_update(conn: &mut PgConnection, loan_id: Uuid) -> Result<Loan, ApiError> {
        loans::table
            .find(loan_id)
            .select(Loan::as_select())
            .for_update()
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Loan not found".into()).into())
    }

    /// Ownership-scoped lookup; another user's loan reads as missing.
    pub fn find_for_user(
        conn: &mut PgConnection,
        loan_id: Uuid,
        user_id: Uuid,
    ) -> Result<Loan, ApiError> {
        loans::table
            .find(loan_id)
            .filter(loans::user_id.eq(user_id))
            .select(Loan::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Loan not found".into()).into())
    }

    /// Writes `next` and stamps the matching lifecycle timestamp. Callers have
    /// already checked the transition under the row lock.
    pub fn set_status(
        conn: &mut PgConnection,
        loan_id: Uuid,
        next: LoanStatus,
    ) -> Result<Loan, ApiError> {
        let now = Utc::now();
        let target = loans::table.find(loan_id);

        let updated = match next {
            LoanStatus::Approved => diesel::update(target)
                .set((
                    loans::status.eq(next),
                    loans::approved_at.eq(Some(now)),
                    loans::updated_at.eq(now),
                ))
                .returning(Loan::as_returning())
                .get_result(conn),
            LoanStatus::Disbursed => diesel::update(target)
                .set((
                    loans::status.eq(next),
                    loans::disbursed_at.eq(Some(now)),
                    loans::updated_at.eq(now),
                ))
                .returning(Loan::as_returning())
                .get_result(conn),
            LoanStatus::Completed => diesel::update(target)
                .set((
                    loans::status.eq(next),
                    loans::completed_at.eq(Some(now)),
                    loans::updated_at.eq(now),
                ))
                .returning(Loan::as_returning())
                .get_result(conn),
            _ => diesel::update(target)
                .set((loans::status.eq(next), loans::updated_at.eq(now)))
                .returning(Loan::as_returning())
                .get_result(conn),
        };

        updated.map_err(ApiError::Database)
    }

    pub fn reject(conn: &mut PgConnection, loan_id: Uuid, reason: &str) -> Result<Loan, ApiError> {
        diesel::update(loans::table.find(loan_id))
            .set((
                loans::status.eq(LoanStatus::Rejected),
                loans::rejection_reason.eq(reason),
                loans::updated_at.eq(Utc::now()),
            ))
            .returning(Loan::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn mark_admin_fee_paid(conn: &mut PgConnection, loan_id: Uuid) -> Result<(), ApiError> {
        diesel::update(loans::table.find(loan_id))
            .set((
                loans::admin_fee_paid.eq(true),
                loans::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }
}
