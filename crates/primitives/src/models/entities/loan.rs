use crate::models::entities::enum_types::{CurrencyCode, LoanStatus, RepaymentStatus};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::loans)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub principal: i64,
    pub interest_rate_bps: i32,
    pub tenure_months: i32,
    pub admin_fee: i64,
    pub admin_fee_paid: bool,
    pub currency: CurrencyCode,
    pub status: LoanStatus,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub disbursed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::loans)]
pub struct NewLoan {
    pub user_id: Uuid,
    pub principal: i64,
    pub interest_rate_bps: i32,
    pub tenure_months: i32,
    pub admin_fee: i64,
    pub currency: CurrencyCode,
    pub status: LoanStatus,
}

/// One scheduled installment. `amount_paid` never exceeds `amount`.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(table_name = crate::schema::repayments)]
#[diesel(belongs_to(Loan))]
pub struct Repayment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub installment_number: i32,
    pub amount: i64,
    pub principal: i64,
    pub interest: i64,
    pub amount_paid: i64,
    pub due_date: NaiveDate,
    pub status: RepaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repayment {
    pub fn outstanding(&self) -> i64 {
        self.amount - self.amount_paid
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::repayments)]
pub struct NewRepayment {
    pub loan_id: Uuid,
    pub installment_number: i32,
    pub amount: i64,
    pub principal: i64,
    pub interest: i64,
    pub due_date: NaiveDate,
    pub status: RepaymentStatus,
}
