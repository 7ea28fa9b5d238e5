pub use crate::app_state::AppState;
use crate::clients::gateway::InitializeTransaction;
use crate::repositories::card_repository::VirtualCardRepository;
use crate::repositories::loan_repository::LoanRepository;
use crate::repositories::payment_repository::PaymentRepository;
use crate::repositories::repayment_repository::RepaymentRepository;
use crate::repositories::user_repository::UserRepository;
use diesel::result::DatabaseErrorKind;
use lendora_primitives::error::{ApiError, GatewayError, LedgerError};
use lendora_primitives::models::entities::enum_types::{
    CardStatus, CurrencyCode, PaymentStatus, PaymentType,
};
use lendora_primitives::models::payment::{NewPayment, Payment};
use lendora_primitives::models::payment_dto::{
    InitializePaymentRequest, InitializePaymentResponse,
};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

/// What a checkout resolves to once the request has been checked against
/// loans and cards.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedCheckout {
    amount: i64,
    currency: CurrencyCode,
}

/// An existing payment answers a repeated initialize only if it is the same checkout.
fn is_same_checkout(existing: &Payment, user_id: Uuid, req: &InitializePaymentRequest, amount: i64) -> bool {
    existing.user_id == user_id
        && existing.amount == amount
        && existing.gateway == req.gateway
        && existing.payment_type == req.payment_type
        && existing.loan_id == req.loan_id
        && existing.virtual_card_id == req.virtual_card_id
}

pub struct PaymentService;

impl PaymentService {
    /// Creates the local `pending` payment, then asks the gateway for a
    /// checkout URL. Idempotent by `reference`.
    pub async fn initialize(
        state: &AppState,
        user_id: Uuid,
        req: InitializePaymentRequest,
    ) -> Result<InitializePaymentResponse, ApiError> {
        req.validate()?;

        let gateway = state.gateways.get(req.gateway)?;

        let mut conn = state.db.get().map_err(|e| {
            error!("payments.initialize: db connection failed: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;

        let checkout = Self::resolve_checkout(&mut conn, state, user_id, &req)?;
        let user = UserRepository::find_by_id(&mut conn, user_id)?;

        let payment = match PaymentRepository::find_by_reference(&mut conn, &req.reference)? {
            Some(existing) => {
                if !is_same_checkout(&existing, user_id, &req, checkout.amount) {
                    return Err(LedgerError::DuplicateReference(req.reference).into());
                }

                if existing.status != PaymentStatus::Pending || existing.authorization_url.is_some() {
                    info!(reference = %existing.reference, "payments.initialize: replayed");
                    return Ok(InitializePaymentResponse {
                        reference: existing.reference,
                        authorization_url: existing.authorization_url,
                        gateway: existing.gateway,
                        status: existing.status,
                    });
                }

                existing
            }
            None => PaymentRepository::create(
                &mut conn,
                NewPayment {
                    user_id,
                    loan_id: req.loan_id,
                    repayment_id: req.repayment_id,
                    virtual_card_id: req.virtual_card_id,
                    amount: checkout.amount,
                    currency: checkout.currency,
                    gateway: req.gateway,
                    reference: &req.reference,
                    status: PaymentStatus::Pending,
                    payment_type: req.payment_type,
                },
            )
            .map_err(|e| match e {
                ApiError::Database(diesel::result::Error::DatabaseError(
                    DatabaseErrorKind::UniqueViolation,
                    _,
                )) => LedgerError::DuplicateReference(req.reference.clone()).into(),
                other => other,
            })?,
        };

        let currency = payment.currency.to_string();
        let callback_url = req
            .callback_url
            .clone()
            .unwrap_or_else(|| format!("{}/payments/callback", state.config.app_url));

        let initialized = gateway
            .initialize_transaction(InitializeTransaction {
                email: &user.email,
                amount: payment.amount,
                currency: &currency,
                reference: &payment.reference,
                callback_url: Some(&callback_url),
                metadata: json!({
                    "payment_type": payment.payment_type,
                    "loan_id": payment.loan_id,
                    "virtual_card_id": payment.virtual_card_id,
                }),
            })
            .await;

        match initialized {
            Ok(init) => {
                let payment = PaymentRepository::set_authorization(
                    &mut conn,
                    payment.id,
                    &init.authorization_url,
                    init.provider_transaction_id.as_deref(),
                )?;

                info!(
                    reference = %payment.reference,
                    gateway = %payment.gateway,
                    amount = payment.amount,
                    "payments.initialize: checkout created"
                );

                Ok(InitializePaymentResponse {
                    reference: payment.reference,
                    authorization_url: payment.authorization_url,
                    gateway: payment.gateway,
                    status: payment.status,
                })
            }
            Err(GatewayError::Rejected(reason)) => {
                warn!(reference = %payment.reference, %reason, "payments.initialize: gateway refused");
                PaymentRepository::mark_failed(&mut conn, payment.id, &reason)?;
                Err(LedgerError::GatewayRejected(reason).into())
            }
            // Left pending without a URL; repeating the call retries the gateway.
            Err(other) => Err(other.into()),
        }
    }

    fn resolve_checkout(
        conn: &mut diesel::PgConnection,
        state: &AppState,
        user_id: Uuid,
        req: &InitializePaymentRequest,
    ) -> Result<ResolvedCheckout, ApiError> {
        match req.payment_type {
            PaymentType::WalletFunding => Ok(ResolvedCheckout {
                amount: req.amount,
                currency: state.config.default_currency,
            }),
            PaymentType::Repayment => {
                let loan_id = req
                    .loan_id
                    .ok_or_else(|| ApiError::BadRequest("loan_id is required for repayments".into()))?;
                let loan = LoanRepository::find_for_user(conn, loan_id, user_id)?;

                if !loan.status.accepts_repayment() {
                    return Err(LedgerError::InvalidState(format!(
                        "Loan is {} and cannot take repayments",
                        loan.status
                    ))
                    .into());
                }

                if let Some(repayment_id) = req.repayment_id {
                    RepaymentRepository::find_for_loan(conn, repayment_id, loan_id)?;
                }

                Ok(ResolvedCheckout {
                    amount: req.amount,
                    currency: loan.currency,
                })
            }
            PaymentType::AdminFee => {
                let loan_id = req
                    .loan_id
                    .ok_or_else(|| ApiError::BadRequest("loan_id is required for admin fees".into()))?;
                let loan = LoanRepository::find_for_user(conn, loan_id, user_id)?;

                if loan.admin_fee_paid || loan.admin_fee <= 0 {
                    return Err(LedgerError::InvalidState("Admin fee already settled".into()).into());
                }

                Ok(ResolvedCheckout {
                    amount: loan.admin_fee,
                    currency: loan.currency,
                })
            }
            PaymentType::CardFunding => {
                let card_id = req.virtual_card_id.ok_or_else(|| {
                    ApiError::BadRequest("virtual_card_id is required for card funding".into())
                })?;
                let card = VirtualCardRepository::find_for_user(conn, card_id, user_id)?;

                if card.status != CardStatus::Active {
                    return Err(LedgerError::InvalidState(format!("Card is {}", card.status)).into());
                }

                Ok(ResolvedCheckout {
                    amount: req.amount,
                    currency: card.currency,
                })
            }
        }
    }
}
