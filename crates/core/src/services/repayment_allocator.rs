use chrono::Utc;
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::entities::enum_types::{LoanStatus, RepaymentStatus};
use lendora_primitives::models::loan::Repayment;
use tracing::info;
use uuid::Uuid;

use crate::repositories::loan_repository::LoanRepository;
use crate::repositories::repayment_repository::RepaymentRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInstallment {
    pub repayment_id: Uuid,
    pub applied: i64,
    pub amount_paid: i64,
    pub status: RepaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    pub installments: Vec<PlannedInstallment>,
    pub applied: i64,
    pub leftover: i64,
}

/// Walks `open` in the given order, settling each installment before
/// touching the next. Whatever cannot be placed is returned as `leftover`.
pub fn plan_allocation(open: &[Repayment], amount: i64) -> Result<AllocationPlan, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount);
    }

    let mut remaining = amount;
    let mut installments = Vec::new();

    for repayment in open {
        if remaining == 0 {
            break;
        }

        let outstanding = repayment.outstanding();
        if outstanding <= 0 {
            continue;
        }

        let applied = outstanding.min(remaining);
        let amount_paid = repayment.amount_paid + applied;

        if amount_paid > repayment.amount {
            return Err(LedgerError::RepaymentOverAllocation {
                outstanding,
                requested: applied,
            });
        }

        // an overdue installment stays overdue until it is settled in full
        let status = if amount_paid == repayment.amount {
            RepaymentStatus::Paid
        } else if repayment.status == RepaymentStatus::Overdue {
            RepaymentStatus::Overdue
        } else {
            RepaymentStatus::Partial
        };

        installments.push(PlannedInstallment {
            repayment_id: repayment.id,
            applied,
            amount_paid,
            status,
        });
        remaining -= applied;
    }

    Ok(AllocationPlan {
        installments,
        applied: amount - remaining,
        leftover: remaining,
    })
}

#[derive(Debug, Clone)]
pub struct Allocation {
    pub loan_id: Uuid,
    pub applied: i64,
    pub leftover: i64,
    pub loan_status: LoanStatus,
    pub installments: Vec<Repayment>,
}

pub struct RepaymentAllocator;

impl RepaymentAllocator {
    /// Applies `amount` to the loan's open installments under row locks.
    /// The allocator never touches money; callers decide what to do with
    /// `applied` and `leftover`.
    pub fn apply(
        conn: &mut PgConnection,
        loan_id: Uuid,
        amount: i64,
        payment_reference: &str,
    ) -> Result<Allocation, ApiError> {
        conn.transaction::<Allocation, ApiError, _>(|conn| {
            let loan = LoanRepository::find_by_id_for_update(conn, loan_id)?;

            if !loan.status.accepts_repayment() {
                return Err(LedgerError::InvalidState(format!(
                    "Loan is {} and cannot take repayments",
                    loan.status
                ))
                .into());
            }

            let open = RepaymentRepository::open_for_loan_for_update(conn, loan_id)?;
            let plan = plan_allocation(&open, amount)?;

            let now = Utc::now();
            let mut installments = Vec::with_capacity(plan.installments.len());
            for item in &plan.installments {
                let paid_at = (item.status == RepaymentStatus::Paid).then_some(now);
                installments.push(RepaymentRepository::record_allocation(
                    conn,
                    item.repayment_id,
                    item.amount_paid,
                    item.status,
                    paid_at,
                    payment_reference,
                )?);
            }

            let mut loan_status = loan.status;
            if plan.applied > 0 && loan_status == LoanStatus::Disbursed {
                loan_status = LoanRepository::set_status(conn, loan_id, LoanStatus::Active)?.status;
            }

            if RepaymentRepository::count_unpaid(conn, loan_id)? == 0 {
                loan_status = LoanRepository::set_status(conn, loan_id, LoanStatus::Completed)?.status;
                info!(%loan_id, "Loan fully repaid");
            }

            info!(
                %loan_id,
                reference = payment_reference,
                applied = plan.applied,
                leftover = plan.leftover,
                "Repayment allocated"
            );

            Ok(Allocation {
                loan_id,
                applied: plan.applied,
                leftover: plan.leftover,
                loan_status,
                installments,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn installment(number: i32, amount: i64, amount_paid: i64) -> Repayment {
        Repayment {
            id: Uuid::new_v4(),
            loan_id: Uuid::nil(),
            installment_number: number,
            amount,
            principal: amount,
            interest: 0,
            amount_paid,
            due_date: NaiveDate::from_ymd_opt(2026, number as u32, 1).unwrap(),
            status: if amount_paid > 0 {
                RepaymentStatus::Partial
            } else {
                RepaymentStatus::Pending
            },
            paid_at: None,
            payment_reference: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn pays_first_installment_and_part_of_second() {
        let open = vec![installment(1, 3000, 0), installment(2, 3000, 0)];
        let plan = plan_allocation(&open, 4000).unwrap();

        assert_eq!(plan.applied, 4000);
        assert_eq!(plan.leftover, 0);
        assert_eq!(plan.installments.len(), 2);
        assert_eq!(plan.installments[0].status, RepaymentStatus::Paid);
        assert_eq!(plan.installments[0].applied, 3000);
        assert_eq!(plan.installments[1].status, RepaymentStatus::Partial);
        assert_eq!(plan.installments[1].applied, 1000);
        assert_eq!(plan.installments[1].amount_paid, 1000);
    }

    #[test]
    fn partial_installment_only_needs_its_remainder() {
        let open = vec![installment(1, 3000, 1000), installment(2, 3000, 0)];
        let plan = plan_allocation(&open, 2000).unwrap();

        assert_eq!(plan.installments.len(), 1);
        assert_eq!(plan.installments[0].amount_paid, 3000);
        assert_eq!(plan.installments[0].status, RepaymentStatus::Paid);
        assert_eq!(plan.leftover, 0);
    }

    #[test]
    fn overpayment_is_returned_as_leftover() {
        let open = vec![installment(1, 3000, 0), installment(2, 3000, 500)];
        let plan = plan_allocation(&open, 7000).unwrap();

        assert_eq!(plan.applied, 5500);
        assert_eq!(plan.leftover, 1500);
        assert!(plan
            .installments
            .iter()
            .all(|i| i.status == RepaymentStatus::Paid));
    }

    #[test]
    fn nothing_open_leaves_everything_over() {
        let plan = plan_allocation(&[], 2500).unwrap();
        assert_eq!(plan.applied, 0);
        assert_eq!(plan.leftover, 2500);
        assert!(plan.installments.is_empty());
    }

    #[test]
    fn repeated_allocations_never_exceed_installment_amount() {
        let mut open = vec![installment(1, 3000, 0), installment(2, 3000, 0)];

        for payment in [700, 1900, 2500, 4000] {
            let plan = plan_allocation(&open, payment).unwrap();
            for item in plan.installments {
                let row = open.iter_mut().find(|r| r.id == item.repayment_id).unwrap();
                row.amount_paid = item.amount_paid;
                row.status = item.status;
            }
            assert!(open.iter().all(|r| r.amount_paid <= r.amount));
            open.retain(|r| r.status != RepaymentStatus::Paid);
        }

        assert!(open.is_empty());
    }

    #[test]
    fn partial_payment_keeps_an_overdue_installment_overdue() {
        let mut late = installment(1, 3000, 0);
        late.status = RepaymentStatus::Overdue;
        let open = vec![late, installment(2, 3000, 0)];

        let plan = plan_allocation(&open, 1000).unwrap();
        assert_eq!(plan.installments.len(), 1);
        assert_eq!(plan.installments[0].amount_paid, 1000);
        assert_eq!(plan.installments[0].status, RepaymentStatus::Overdue);

        let mut open = open;
        open[0].amount_paid = 1000;
        let plan = plan_allocation(&open, 2500).unwrap();
        assert_eq!(plan.installments[0].status, RepaymentStatus::Paid);
        assert_eq!(plan.installments[1].status, RepaymentStatus::Partial);
    }

    #[test]
    fn zero_amount_is_invalid() {
        assert_eq!(
            plan_allocation(&[installment(1, 3000, 0)], 0),
            Err(LedgerError::InvalidAmount)
        );
    }
}
