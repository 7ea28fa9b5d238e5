use crate::app_state::AppState;
use crate::repositories::journal_repository::JournalRepository;
use crate::repositories::loan_repository::LoanRepository;
use crate::repositories::repayment_repository::RepaymentRepository;
use crate::repositories::wallet_repository::WalletRepository;
use crate::services::audit_service::AuditService;
use crate::services::ledger_service::{LedgerPosting, LedgerService};
use crate::services::repayment_allocator::RepaymentAllocator;
use chrono::{Months, NaiveDate, Utc};
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::{
    EntryCategory, LoanStatus, RepaymentStatus,
};
use lendora_primitives::models::loan::{Loan, NewLoan, NewRepayment};
use lendora_primitives::models::loan_dto::{
    AllocationResponse, LoanApplicationRequest, LoanDetailsResponse, LoanDto,
    RepayFromWalletRequest, RepaymentDto,
};
use lendora_primitives::money::{apply_bps, narrow, BPS_DENOMINATOR};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Flat interest over the whole tenure: `principal * rate_bps * months / (12 * 10_000)`.
pub fn total_flat_interest(
    principal: i64,
    rate_bps: i32,
    tenure_months: i32,
) -> Result<i64, LedgerError> {
    let numerator = i128::from(principal) * i128::from(rate_bps) * i128::from(tenure_months);
    narrow(numerator / (12 * i128::from(BPS_DENOMINATOR)))
}

/// Equal monthly installments, remainders on the last one, first due one
/// month after `disbursed_on`.
pub fn generate_schedule(
    loan_id: Uuid,
    principal: i64,
    rate_bps: i32,
    tenure_months: i32,
    disbursed_on: NaiveDate,
) -> Result<Vec<NewRepayment>, LedgerError> {
    if principal <= 0 {
        return Err(LedgerError::InvalidAmount);
    }
    if tenure_months <= 0 {
        return Err(LedgerError::InvalidState("Tenure must be at least one month".into()));
    }

    let months = tenure_months as i64;
    let interest = total_flat_interest(principal, rate_bps, tenure_months)?;

    let principal_share = principal / months;
    let interest_share = interest / months;

    (1..=tenure_months)
        .map(|n| {
            let last = n == tenure_months;
            let principal_part = if last {
                principal - principal_share * (months - 1)
            } else {
                principal_share
            };
            let interest_part = if last {
                interest - interest_share * (months - 1)
            } else {
                interest_share
            };

            let due_date = disbursed_on
                .checked_add_months(Months::new(n as u32))
                .ok_or_else(|| LedgerError::InvalidState("Due date out of range".into()))?;

            Ok(NewRepayment {
                loan_id,
                installment_number: n,
                amount: principal_part + interest_part,
                principal: principal_part,
                interest: interest_part,
                due_date,
                status: RepaymentStatus::Pending,
            })
        })
        .collect()
}

fn ensure_transition(loan: &Loan, next: LoanStatus) -> Result<(), LedgerError> {
    if loan.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(LedgerError::InvalidState(format!(
            "Loan cannot move from {} to {}",
            loan.status, next
        )))
    }
}

pub fn disbursement_reference(loan_id: Uuid) -> String {
    format!("loan-disbursement:{}", loan_id)
}

pub struct LoanService;

impl LoanService {
    pub async fn apply_for_loan(
        state: &AppState,
        user_id: Uuid,
        req: LoanApplicationRequest,
    ) -> Result<LoanDto, ApiError> {
        req.validate()?;

        let currency = req.currency.unwrap_or(state.config.default_currency);
        let admin_fee = apply_bps(req.principal, state.config.fees.loan_admin_fee_bps)?;

        let mut conn = state.db.get()?;
        let loan = conn.transaction::<_, ApiError, _>(|conn| {
            LedgerService::ensure_wallet(conn, user_id, currency)?;
            LoanRepository::create(
                conn,
                NewLoan {
                    user_id,
                    principal: req.principal,
                    interest_rate_bps: req.interest_rate_bps,
                    tenure_months: req.tenure_months,
                    admin_fee,
                    currency,
                    status: LoanStatus::Pending,
                },
            )
        })?;

        info!(loan_id = %loan.id, %user_id, principal = loan.principal, "loans.apply: application received");
        Ok(LoanDto::from(loan))
    }

    pub async fn get_loan(
        state: &AppState,
        user_id: Uuid,
        loan_id: Uuid,
    ) -> Result<LoanDetailsResponse, ApiError> {
        let mut conn = state.db.get()?;
        let loan = LoanRepository::find_for_user(&mut conn, loan_id, user_id)?;
        let schedule = RepaymentRepository::list_for_loan(&mut conn, loan_id)?;

        let outstanding = schedule.iter().map(|r| r.outstanding()).sum();

        Ok(LoanDetailsResponse {
            loan: LoanDto::from(loan),
            schedule: schedule.into_iter().map(RepaymentDto::from).collect(),
            outstanding,
        })
    }

    pub async fn start_review(state: &AppState, admin_id: Uuid, loan_id: Uuid) -> Result<LoanDto, ApiError> {
        Self::transition(state, admin_id, loan_id, LoanStatus::UnderReview)
    }

    pub async fn approve(state: &AppState, admin_id: Uuid, loan_id: Uuid) -> Result<LoanDto, ApiError> {
        Self::transition(state, admin_id, loan_id, LoanStatus::Approved)
    }

    pub async fn reject(
        state: &AppState,
        admin_id: Uuid,
        loan_id: Uuid,
        reason: &str,
    ) -> Result<LoanDto, ApiError> {
        let mut conn = state.db.get()?;
        let loan = conn.transaction::<_, ApiError, _>(|conn| {
            let loan = LoanRepository::find_by_id_for_update(conn, loan_id)?;
            ensure_transition(&loan, LoanStatus::Rejected)?;

            let loan = LoanRepository::reject(conn, loan_id, reason)?;
            AuditService::record(
                conn,
                Some(admin_id),
                "loan.rejected",
                "loan",
                &loan_id.to_string(),
                json!({ "reason": reason }),
            )?;
            Ok(loan)
        })?;

        Ok(LoanDto::from(loan))
    }

    /// Credits the principal to the borrower's wallet and writes the schedule,
    /// all in one transaction. The admin fee must be settled first.
    pub async fn disburse(state: &AppState, admin_id: Uuid, loan_id: Uuid) -> Result<LoanDetailsResponse, ApiError> {
        let mut conn = state.db.get()?;

        let (loan, schedule) = conn.transaction::<_, ApiError, _>(|conn| {
            let loan = LoanRepository::find_by_id_for_update(conn, loan_id)?;
            ensure_transition(&loan, LoanStatus::Disbursed)?;

            if loan.admin_fee > 0 && !loan.admin_fee_paid {
                return Err(LedgerError::InvalidState("Admin fee has not been paid".into()).into());
            }

            let today = Utc::now().date_naive();
            let plan = generate_schedule(
                loan.id,
                loan.principal,
                loan.interest_rate_bps,
                loan.tenure_months,
                today,
            )?;
            let schedule = RepaymentRepository::insert_schedule(conn, &plan)?;

            let wallet = LedgerService::ensure_wallet(conn, loan.user_id, loan.currency)?;
            let reference = disbursement_reference(loan.id);
            LedgerService::credit(
                conn,
                LedgerPosting::new(wallet.id, loan.principal, EntryCategory::LoanDisbursement, &reference)
                    .description("Loan disbursement")
                    .metadata(json!({ "loan_id": loan.id })),
            )?;

            let loan = LoanRepository::set_status(conn, loan.id, LoanStatus::Disbursed)?;
            AuditService::record(
                conn,
                Some(admin_id),
                "loan.disbursed",
                "loan",
                &loan.id.to_string(),
                json!({ "principal": loan.principal, "installments": schedule.len() }),
            )?;

            Ok((loan, schedule))
        })?;

        info!(%loan_id, principal = loan.principal, "loans.disburse: principal credited");

        let outstanding = schedule.iter().map(|r| r.outstanding()).sum();
        Ok(LoanDetailsResponse {
            loan: LoanDto::from(loan),
            schedule: schedule.into_iter().map(RepaymentDto::from).collect(),
            outstanding,
        })
    }

    /// Pays installments from the borrower's wallet. Only the amount the loan
    /// absorbs is debited; a request larger than the outstanding balance is
    /// capped rather than refused.
    pub async fn repay_from_wallet(
        state: &AppState,
        user_id: Uuid,
        loan_id: Uuid,
        req: RepayFromWalletRequest,
    ) -> Result<AllocationResponse, ApiError> {
        req.validate()?;

        let mut conn = state.db.get()?;
        let loan = LoanRepository::find_for_user(&mut conn, loan_id, user_id)?;

        let allocation = conn.transaction::<_, ApiError, _>(|conn| {
            let wallet = LedgerService::ensure_wallet(conn, user_id, loan.currency)?;
            // Serializes against other postings on this wallet before the replay check.
            WalletRepository::find_by_id_for_update(conn, wallet.id)?;

            if let Some(existing) = JournalRepository::find_by_reference(conn, &req.reference)? {
                if existing.wallet_id != wallet.id || existing.category != EntryCategory::LoanRepayment {
                    return Err(LedgerError::DuplicateReference(req.reference.clone()).into());
                }
                let loan = LoanRepository::find_by_id(conn, loan_id)?;
                return Ok(AllocationResponse {
                    loan_id,
                    applied: existing.amount,
                    leftover: 0,
                    loan_status: loan.status,
                    installments: Vec::new(),
                });
            }

            let allocation = RepaymentAllocator::apply(conn, loan_id, req.amount, &req.reference)?;

            if allocation.applied > 0 {
                LedgerService::debit(
                    conn,
                    LedgerPosting::new(wallet.id, allocation.applied, EntryCategory::LoanRepayment, &req.reference)
                        .description("Loan repayment")
                        .metadata(json!({ "loan_id": loan_id })),
                )?;
            }

            Ok(AllocationResponse {
                loan_id,
                applied: allocation.applied,
                leftover: allocation.leftover,
                loan_status: allocation.loan_status,
                installments: allocation.installments.into_iter().map(RepaymentDto::from).collect(),
            })
        })?;

        info!(%loan_id, applied = allocation.applied, "loans.repay: wallet repayment applied");
        Ok(allocation)
    }

    /// Daily job: installments past their due date become `overdue`.
    pub fn mark_overdue(state: &AppState) -> Result<usize, ApiError> {
        let mut conn = state.db.get()?;
        let today = Utc::now().date_naive();
        let count = RepaymentRepository::mark_overdue(&mut conn, today)?;

        if count > 0 {
            warn!(count, "loans: installments marked overdue");
        }
        Ok(count)
    }

    fn transition(state: &AppState, admin_id: Uuid, loan_id: Uuid, next: LoanStatus) -> Result<LoanDto, ApiError> {
        let mut conn = state.db.get()?;
        let loan = conn.transaction::<_, ApiError, _>(|conn| {
            let loan = LoanRepository::find_by_id_for_update(conn, loan_id)?;
            ensure_transition(&loan, next)?;

            let loan = LoanRepository::set_status(conn, loan_id, next)?;
            AuditService::record(
                conn,
                Some(admin_id),
                &format!("loan.{}", next),
                "loan",
                &loan_id.to_string(),
                json!({}),
            )?;
            Ok(loan)
        })?;

        info!(%loan_id, status = %loan.status, "loans: status changed");
        Ok(LoanDto::from(loan))
    }
}
