use crate::models::entities::enum_types::{CurrencyCode, LoanStatus, RepaymentStatus};
use crate::models::entities::loan::{Loan, Repayment};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoanApplicationRequest {
    #[validate(range(min = 100_000, message = "Principal must be at least 1000.00"))]
    pub principal: i64,
    #[validate(range(min = 0, max = 10_000))]
    pub interest_rate_bps: i32,
    #[validate(range(min = 1, max = 60))]
    pub tenure_months: i32,
    pub currency: Option<CurrencyCode>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RejectRequest {
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RepayFromWalletRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
    #[validate(length(min = 8, max = 64))]
    pub reference: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RepaymentDto {
    pub id: Uuid,
    pub installment_number: i32,
    pub amount: i64,
    pub principal: i64,
    pub interest: i64,
    pub amount_paid: i64,
    pub due_date: NaiveDate,
    pub status: RepaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
}

impl From<Repayment> for RepaymentDto {
    fn from(r: Repayment) -> Self {
        Self {
            id: r.id,
            installment_number: r.installment_number,
            amount: r.amount,
            principal: r.principal,
            interest: r.interest,
            amount_paid: r.amount_paid,
            due_date: r.due_date,
            status: r.status,
            paid_at: r.paid_at,
            payment_reference: r.payment_reference,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoanDto {
    pub id: Uuid,
    pub principal: i64,
    pub interest_rate_bps: i32,
    pub tenure_months: i32,
    pub admin_fee: i64,
    pub admin_fee_paid: bool,
    pub currency: CurrencyCode,
    pub status: LoanStatus,
    pub rejection_reason: Option<String>,
    pub disbursed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Loan> for LoanDto {
    fn from(l: Loan) -> Self {
        Self {
            id: l.id,
            principal: l.principal,
            interest_rate_bps: l.interest_rate_bps,
            tenure_months: l.tenure_months,
            admin_fee: l.admin_fee,
            admin_fee_paid: l.admin_fee_paid,
            currency: l.currency,
            status: l.status,
            rejection_reason: l.rejection_reason,
            disbursed_at: l.disbursed_at,
            completed_at: l.completed_at,
            created_at: l.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoanDetailsResponse {
    pub loan: LoanDto,
    pub schedule: Vec<RepaymentDto>,
    pub outstanding: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AllocationResponse {
    pub loan_id: Uuid,
    pub applied: i64,
    pub leftover: i64,
    pub loan_status: LoanStatus,
    pub installments: Vec<RepaymentDto>,
}
