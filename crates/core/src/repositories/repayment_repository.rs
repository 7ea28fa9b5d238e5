use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::RepaymentStatus;
use lendora_primitives::models::loan::{NewRepayment, Repayment};
use lendora_primitives::schema::repayments;
use uuid::Uuid;

const OPEN_STATUSES: [RepaymentStatus; 3] = [
    RepaymentStatus::Pending,
    RepaymentStatus::Partial,
    RepaymentStatus::Overdue,
];

pub struct RepaymentRepository;

impl RepaymentRepository {
    pub fn insert_schedule(
        conn: &mut PgConnection,
        schedule: &[NewRepayment],
    ) -> Result<Vec<Repayment>, ApiError> {
        diesel::insert_into(repayments::table)
            .values(schedule)
            .returning(Repayment::as_returning())
            .get_results(conn)
            .map_err(ApiError::Database)
    }

    pub fn list_for_loan(conn: &mut PgConnection, loan_id: Uuid) -> Result<Vec<Repayment>, ApiError> {
        repayments::table
            .filter(repayments::loan_id.eq(loan_id))
            .order(repayments::installment_number.asc())
            .select(Repayment::as_select())
            .load(conn)
            .map_err(ApiError::Database)
    }

    /// Open installments in allocation order, locked for the rest of the transaction.
    pub fn open_for_loan_for_update(
        conn: &mut PgConnection,
        loan_id: Uuid,
    ) -> Result<Vec<Repayment>, ApiError> {
        repayments::table
            .filter(repayments::loan_id.eq(loan_id))
            .filter(repayments::status.eq_any(OPEN_STATUSES))
            .order((
                repayments::due_date.asc(),
                repayments::installment_number.asc(),
            ))
            .select(Repayment::as_select())
            .for_update()
            .load(conn)
            .map_err(ApiError::Database)
    }

    pub fn find_for_loan(
        conn: &mut PgConnection,
        repayment_id: Uuid,
        loan_id: Uuid,
    ) -> Result<Repayment, ApiError> {
        repayments::table
            .find(repayment_id)
            .filter(repayments::loan_id.eq(loan_id))
            .select(Repayment::as_select())
            .first(conn)
            .optional()
            .map_err(ApiError::Database)?
            .ok_or_else(|| LedgerError::NotFound("Repayment not found".into()).into())
    }

    pub fn record_allocation(
        conn: &mut PgConnection,
        repayment_id: Uuid,
        amount_paid: i64,
        status: RepaymentStatus,
        paid_at: Option<DateTime<Utc>>,
        payment_reference: &str,
    ) -> Result<Repayment, ApiError> {
        diesel::update(repayments::table.find(repayment_id))
            .set((
                repayments::amount_paid.eq(amount_paid),
                repayments::status.eq(status),
                repayments::paid_at.eq(paid_at),
                repayments::payment_reference.eq(payment_reference),
                repayments::updated_at.eq(Utc::now()),
            ))
            .returning(Repayment::as_returning())
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    pub fn count_unpaid(conn: &mut PgConnection, loan_id: Uuid) -> Result<i64, ApiError> {
        repayments::table
            .filter(repayments::loan_id.eq(loan_id))
            .filter(repayments::status.ne(RepaymentStatus::Paid))
            .count()
            .get_result(conn)
            .map_err(ApiError::Database)
    }

    /// Flags pending and partial installments due before `today`.
    pub fn mark_overdue(conn: &mut PgConnection, today: NaiveDate) -> Result<usize, ApiError> {
        diesel::update(
            repayments::table
                .filter(repayments::due_date.lt(today))
                .filter(
                    repayments::status
                        .eq_any([RepaymentStatus::Pending, RepaymentStatus::Partial]),
                ),
        )
        .set((
            repayments::status.eq(RepaymentStatus::Overdue),
            repayments::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .map_err(ApiError::Database)
    }
}
