use crate::app_state::AppState;
use crate::clients::gateway::{VerificationOutcome, VerifiedPayment};
use crate::repositories::loan_repository::LoanRepository;
use crate::repositories::payment_repository::PaymentRepository;
use crate::services::audit_service::AuditService;
use crate::services::card_service::CardService;
use crate::services::ledger_service::{LedgerPosting, LedgerService};
use crate::services::repayment_allocator::RepaymentAllocator;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use lendora_primitives::error::{ApiError, GatewayError, LedgerError};
use lendora_primitives::models::entities::enum_types::{
    EntryCategory, LedgerSource, PaymentStatus, PaymentType,
};
use lendora_primitives::models::payment::Payment;
use lendora_primitives::models::card_dto::CardMovementResponse;
use lendora_primitives::models::payment_dto::{PaymentDto, ReconcileResponse};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

/// How a confirmed gateway answer compares with what was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Matches,
    Mismatch { actual: i64, actual_currency: String },
}

pub fn compare_with_payment(payment: &Payment, verified: &VerifiedPayment) -> Verdict {
    let currency_matches = verified
        .currency
        .trim()
        .eq_ignore_ascii_case(&payment.currency.to_string());

    if verified.amount == payment.amount && currency_matches {
        Verdict::Matches
    } else {
        Verdict::Mismatch {
            actual: verified.amount,
            actual_currency: verified.currency.clone(),
        }
    }
}

/// What the settlement transaction did beyond marking the payment successful.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Settlement {
    applied_to_loan: Option<i64>,
    left_in_wallet: Option<i64>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub settled: usize,
    pub failed: usize,
    pub still_pending: usize,
    pub errors: usize,
}

/// Base reference of the wallet -> card leg that follows a card-funding payment.
pub fn card_bridge_reference(payment_reference: &str) -> String {
    format!("{}:card", payment_reference)
}

fn stored_result(payment: Payment) -> ReconcileResponse {
    let settled = payment.status.is_terminal();
    ReconcileResponse {
        payment: PaymentDto::from(payment),
        settled,
        applied_to_loan: None,
        left_in_wallet: None,
        card_funded: None,
    }
}

pub struct ReconciliationService;

impl ReconciliationService {
    /// Same as [`reconcile`](Self::reconcile) but refuses payments owned by someone else.
    pub async fn reconcile_for_user(
        state: &AppState,
        user_id: Uuid,
        reference: &str,
        provider_transaction_id: Option<&str>,
    ) -> Result<ReconcileResponse, ApiError> {
        {
            let mut conn = state.db.get()?;
            match PaymentRepository::find_by_reference(&mut conn, reference)? {
                Some(p) if p.user_id == user_id => {}
                _ => return Err(LedgerError::PaymentNotFound(reference.to_string()).into()),
            }
        }

        Self::reconcile(state, reference, provider_transaction_id).await
    }

    /// Drives a payment to its terminal state. Safe to call any number of
    /// times: once terminal, the stored result is returned untouched.
    pub async fn reconcile(
        state: &AppState,
        reference: &str,
        provider_transaction_id: Option<&str>,
    ) -> Result<ReconcileResponse, ApiError> {
        let payment = {
            let mut conn = state.db.get()?;
            PaymentRepository::find_by_reference(&mut conn, reference)?
                .ok_or_else(|| LedgerError::PaymentNotFound(reference.to_string()))?
        };

        if payment.status.is_terminal() {
            info!(reference, status = %payment.status, "reconcile: already terminal");
            return Ok(stored_result(payment));
        }

        let gateway = state.gateways.get(payment.gateway)?;

        // No connection or lock is held across the provider call.
        let lookup_id = provider_transaction_id.or(payment.gateway_reference.as_deref());
        let outcome = gateway.verify_transaction(&payment.reference, lookup_id).await;

        match outcome {
            Ok(VerificationOutcome::NotYetConfirmed) => {
                info!(reference, "reconcile: not yet confirmed");
                Ok(stored_result(payment))
            }
            Err(GatewayError::Rejected(reason)) => Self::fail(state, payment, &reason),
            Err(other) => {
                warn!(reference, error = %other, "reconcile: gateway unavailable");
                Err(other.into())
            }
            Ok(VerificationOutcome::Confirmed(verified)) => {
                match compare_with_payment(&payment, &verified) {
                    Verdict::Mismatch {
                        actual,
                        actual_currency,
                    } => Self::flag_mismatch(state, payment, actual, actual_currency),
                    Verdict::Matches => Self::settle(state, payment, verified).await,
                }
            }
        }
    }

    fn fail(state: &AppState, payment: Payment, reason: &str) -> Result<ReconcileResponse, ApiError> {
        let mut conn = state.db.get()?;

        let updated = conn.transaction::<_, ApiError, _>(|conn| {
            let locked = PaymentRepository::find_by_reference_for_update(conn, &payment.reference)?;
            if locked.status.is_terminal() {
                return Ok(locked);
            }

            let failed = PaymentRepository::mark_failed(conn, locked.id, reason)?.unwrap_or(locked);
            AuditService::record(
                conn,
                Some(failed.user_id),
                "payment.failed",
                "payment",
                &failed.reference,
                json!({ "reason": reason, "gateway": failed.gateway }),
            )?;
            Ok(failed)
        })?;

        warn!(reference = %updated.reference, reason, "reconcile: payment failed at gateway");
        Ok(stored_result(updated))
    }

    /// Amount or currency disagree: park the payment for review, credit nothing.
    fn flag_mismatch(
        state: &AppState,
        payment: Payment,
        actual: i64,
        actual_currency: String,
    ) -> Result<ReconcileResponse, ApiError> {
        let mut conn = state.db.get()?;

        error!(
            reference = %payment.reference,
            expected = payment.amount,
            actual,
            actual_currency = %actual_currency,
            "reconcile: amount mismatch"
        );

        conn.transaction::<_, ApiError, _>(|conn| {
            let locked = PaymentRepository::find_by_reference_for_update(conn, &payment.reference)?;
            if locked.flagged_for_review || locked.status.is_terminal() {
                return Ok(());
            }

            PaymentRepository::flag_for_review(conn, locked.id, "amount_mismatch")?;
            AuditService::record(
                conn,
                Some(locked.user_id),
                "payment.amount_mismatch",
                "payment",
                &locked.reference,
                json!({
                    "expected": locked.amount,
                    "expected_currency": locked.currency,
                    "actual": actual,
                    "actual_currency": actual_currency,
                    "gateway": locked.gateway,
                }),
            )
        })?;

        Err(LedgerError::AmountMismatch {
            expected: payment.amount,
            expected_currency: payment.currency.to_string(),
            actual,
            actual_currency,
        }
        .into())
    }

    /// Marks the payment successful and applies its money in one transaction.
    /// Card funding runs the card bridge after that transaction commits.
    async fn settle(
        state: &AppState,
        payment: Payment,
        verified: VerifiedPayment,
    ) -> Result<ReconcileResponse, ApiError> {
        let settled = {
            let mut conn = state.db.get()?;
            conn.transaction::<_, ApiError, _>(|conn| {
                let locked =
                    PaymentRepository::find_by_reference_for_update(conn, &payment.reference)?;

                // A concurrent reconcile got here first.
                if locked.status.is_terminal() {
                    return Ok((locked, None));
                }

                let success = PaymentRepository::mark_success(
                    conn,
                    locked.id,
                    verified.provider_reference.as_deref(),
                    Utc::now(),
                )?;
                let settlement = Self::apply_funds(conn, &success)?;

                Ok((success, Some(settlement)))
            })?
        };

        let (payment, settlement) = settled;
        let Some(settlement) = settlement else {
            return Ok(stored_result(payment));
        };

        info!(
            reference = %payment.reference,
            payment_type = %payment.payment_type,
            amount = payment.amount,
            "reconcile: payment settled"
        );

        let card_funded = match (payment.payment_type, payment.virtual_card_id) {
            (PaymentType::CardFunding, Some(card_id)) => {
                let base = card_bridge_reference(&payment.reference);
                match CardService::fund_attempt(state, payment.user_id, card_id, payment.amount, &base)
                    .await
                {
                    Ok(_) => Some(true),
                    Err(e) => {
                        warn!(
                            reference = %payment.reference,
                            error = %e,
                            "reconcile: card funding failed, funds remain in wallet"
                        );
                        Some(false)
                    }
                }
            }
            _ => None,
        };

        Ok(ReconcileResponse {
            payment: PaymentDto::from(payment),
            settled: true,
            applied_to_loan: settlement.applied_to_loan,
            left_in_wallet: settlement.left_in_wallet,
            card_funded,
        })
    }

    /// Gateway money always lands in the user's wallet first; loan payments
    /// then move only what the loan actually absorbs.
    fn apply_funds(conn: &mut PgConnection, payment: &Payment) -> Result<Settlement, ApiError> {
        let wallet = LedgerService::ensure_wallet(conn, payment.user_id, payment.currency)?;

        LedgerService::credit(
            conn,
            LedgerPosting::new(
                wallet.id,
                payment.amount,
                EntryCategory::WalletFunding,
                &payment.reference,
            )
            .source(
                LedgerSource::from(payment.gateway),
                payment.gateway_reference.as_deref(),
            )
            .description("Gateway payment")
            .metadata(json!({ "payment_type": payment.payment_type })),
        )?;

        match payment.payment_type {
            PaymentType::WalletFunding | PaymentType::CardFunding => Ok(Settlement::default()),
            PaymentType::Repayment => {
                let loan_id = payment.loan_id.ok_or_else(|| {
                    LedgerError::InvalidState("Repayment payment without a loan".into())
                })?;

                let loan = LoanRepository::find_by_id(conn, loan_id)?;
                if !loan.status.accepts_repayment() {
                    warn!(
                        reference = %payment.reference,
                        %loan_id,
                        status = %loan.status,
                        "reconcile: loan no longer takes repayments, funds remain in wallet"
                    );
                    return Ok(Settlement {
                        applied_to_loan: Some(0),
                        left_in_wallet: Some(payment.amount),
                    });
                }

                let allocation =
                    RepaymentAllocator::apply(conn, loan_id, payment.amount, &payment.reference)?;

                if allocation.applied > 0 {
                    let debit_reference = format!("{}:repayment", payment.reference);
                    LedgerService::debit(
                        conn,
                        LedgerPosting::new(
                            wallet.id,
                            allocation.applied,
                            EntryCategory::LoanRepayment,
                            &debit_reference,
                        )
                        .description("Loan repayment")
                        .metadata(json!({ "loan_id": loan_id })),
                    )?;
                }

                if allocation.leftover > 0 {
                    AuditService::record(
                        conn,
                        Some(payment.user_id),
                        "loan.overpayment",
                        "loan",
                        &loan_id.to_string(),
                        json!({
                            "reference": payment.reference,
                            "leftover": allocation.leftover,
                        }),
                    )?;
                }

                Ok(Settlement {
                    applied_to_loan: Some(allocation.applied),
                    left_in_wallet: Some(allocation.leftover),
                })
            }
            PaymentType::AdminFee => {
                let loan_id = payment.loan_id.ok_or_else(|| {
                    LedgerError::InvalidState("Admin fee payment without a loan".into())
                })?;

                let loan = LoanRepository::find_by_id_for_update(conn, loan_id)?;
                if loan.admin_fee_paid {
                    return Ok(Settlement {
                        applied_to_loan: Some(0),
                        left_in_wallet: Some(payment.amount),
                    });
                }

                let debit_reference = format!("{}:admin-fee", payment.reference);
                LedgerService::debit(
                    conn,
                    LedgerPosting::new(
                        wallet.id,
                        payment.amount,
                        EntryCategory::AdminFee,
                        &debit_reference,
                    )
                    .description("Loan admin fee")
                    .metadata(json!({ "loan_id": loan_id })),
                )?;
                LoanRepository::mark_admin_fee_paid(conn, loan_id)?;

                Ok(Settlement {
                    applied_to_loan: Some(payment.amount),
                    left_in_wallet: Some(0),
                })
            }
        }
    }

    /// Retries the card leg of a settled card-funding payment whose bridge
    /// failed and left the funds in the wallet. A bridge that already
    /// completed is reported as a replay.
    pub async fn retry_card_bridge(
        state: &AppState,
        user_id: Uuid,
        reference: &str,
    ) -> Result<CardMovementResponse, ApiError> {
        let payment = {
            let mut conn = state.db.get()?;
            PaymentRepository::find_by_reference(&mut conn, reference)?
                .filter(|p| p.user_id == user_id)
                .ok_or_else(|| LedgerError::PaymentNotFound(reference.to_string()))?
        };

        let card_id = match (payment.payment_type, payment.virtual_card_id) {
            (PaymentType::CardFunding, Some(card_id)) => card_id,
            _ => {
                return Err(LedgerError::InvalidState(format!(
                    "Payment {} is not a card funding",
                    reference
                ))
                .into())
            }
        };
        if payment.status != PaymentStatus::Success {
            return Err(LedgerError::InvalidState(format!(
                "Payment {} is {}",
                reference, payment.status
            ))
            .into());
        }

        let base = card_bridge_reference(&payment.reference);
        let result = CardService::fund_attempt(state, user_id, card_id, payment.amount, &base).await?;
        info!(reference, movement = %result.reference, replayed = result.replayed, "reconcile: card bridge retried");
        Ok(result)
    }

    /// Re-reconciles pending payments older than the configured minimum age.
    /// Flagged payments are left for manual review.
    pub async fn sweep_stale(state: &AppState, limit: i64) -> Result<SweepReport, ApiError> {
        let cutoff = Utc::now() - Duration::seconds(state.config.pending_sweep_min_age_secs);

        let stale = {
            let mut conn = state.db.get()?;
            PaymentRepository::find_stale_pending(&mut conn, cutoff, limit)?
        };

        let mut report = SweepReport {
            examined: stale.len(),
            ..SweepReport::default()
        };

        for payment in stale {
            match Self::reconcile(state, &payment.reference, None).await {
                Ok(result) if result.payment.status == PaymentStatus::Success => report.settled += 1,
                Ok(result) if result.payment.status == PaymentStatus::Failed => report.failed += 1,
                Ok(_) => report.still_pending += 1,
                Err(e) => {
                    warn!(reference = %payment.reference, error = %e, "sweep: reconcile failed");
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lendora_primitives::models::entities::enum_types::{CurrencyCode, GatewayProvider};

    fn payment(amount: i64) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            loan_id: None,
            repayment_id: None,
            virtual_card_id: None,
            amount,
            currency: CurrencyCode::NGN,
            gateway: GatewayProvider::Paystack,
            reference: "R1".into(),
            gateway_reference: None,
            authorization_url: None,
            status: PaymentStatus::Pending,
            payment_type: PaymentType::WalletFunding,
            flagged_for_review: false,
            failure_reason: None,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn verified(amount: i64, currency: &str) -> VerifiedPayment {
        VerifiedPayment {
            amount,
            currency: currency.into(),
            provider_reference: Some("4099260516".into()),
        }
    }

    #[test]
    fn exact_amount_and_currency_match() {
        assert_eq!(
            compare_with_payment(&payment(5000), &verified(5000, "NGN")),
            Verdict::Matches
        );
        assert_eq!(
            compare_with_payment(&payment(5000), &verified(5000, "ngn")),
            Verdict::Matches
        );
    }

    #[test]
    fn short_payment_is_a_mismatch() {
        assert_eq!(
            compare_with_payment(&payment(5000), &verified(4999, "NGN")),
            Verdict::Mismatch {
                actual: 4999,
                actual_currency: "NGN".into()
            }
        );
    }

    #[test]
    fn other_currency_is_a_mismatch() {
        assert!(matches!(
            compare_with_payment(&payment(5000), &verified(5000, "USD")),
            Verdict::Mismatch { .. }
        ));
    }

    #[test]
    fn stored_result_reports_terminal_state() {
        let mut p = payment(5000);
        assert!(!stored_result(p.clone()).settled);

        p.status = PaymentStatus::Success;
        let result = stored_result(p);
        assert!(result.settled);
        assert_eq!(result.applied_to_loan, None);
    }
}
