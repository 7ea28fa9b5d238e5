use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::r2d2::PoolError;
use http::StatusCode;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

/// Failure modes of an outbound payment provider or card issuer call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Network failure, timeout, 5xx or an undecodable body. Retryable.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The provider gave a definitive negative answer. Terminal.
    #[error("gateway rejected: {0}")]
    Rejected(String),

    #[error("gateway not configured: {0}")]
    NotConfigured(String),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

/// Ledger and settlement failures. Every variant is raised before the
/// enclosing database transaction commits, so none of them leave partial writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    #[error("account locked: {0}")]
    AccountLocked(String),

    #[error("account inactive")]
    AccountInactive,

    #[error("amount must be strictly positive")]
    InvalidAmount,

    #[error("reference {0} already used with different parameters")]
    DuplicateReference(String),

    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("payment gateway rejected the transaction: {0}")]
    GatewayRejected(String),

    #[error("payment gateway not configured: {0}")]
    GatewayNotConfigured(String),

    #[error("amount mismatch: expected {expected} {expected_currency}, gateway reported {actual} {actual_currency}")]
    AmountMismatch {
        expected: i64,
        expected_currency: String,
        actual: i64,
        actual_currency: String,
    },

    #[error("payment {0} not found")]
    PaymentNotFound(String),

    #[error("allocation of {requested} exceeds outstanding {outstanding} on repayment")]
    RepaymentOverAllocation { outstanding: i64, requested: i64 },

    #[error("card provisioning failed: {0}")]
    CardProvisioningFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl From<GatewayError> for LedgerError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => LedgerError::GatewayUnavailable(msg),
            GatewayError::Rejected(msg) => LedgerError::GatewayRejected(msg),
            GatewayError::NotConfigured(msg) => LedgerError::GatewayNotConfigured(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingHeader,
    InvalidFormat,
    InvalidToken(String),
    Forbidden,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingHeader => write!(f, "Missing Authorization header"),
            AuthError::InvalidFormat => write!(f, "Invalid Authorization header format"),
            AuthError::InvalidToken(msg) => write!(f, "{}", msg),
            AuthError::Forbidden => write!(f, "Insufficient permissions"),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Database(diesel::result::Error),
    DatabaseConnection(String),
    Validation(validator::ValidationErrors),
    BadRequest(String),
    Auth(AuthError),
    Token(String),
    Ledger(LedgerError),
    Webhook(String),
    Internal(String),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Database(e) => write!(f, "Database error: {}", e),
            ApiError::DatabaseConnection(e) => write!(f, "Database connection error: {}", e),
            ApiError::Validation(e) => write!(f, "Validation error: {}", e),
            ApiError::BadRequest(e) => write!(f, "Bad request: {}", e),
            ApiError::Auth(e) => write!(f, "Authentication error: {}", e),
            ApiError::Token(e) => write!(f, "Token error: {}", e),
            ApiError::Ledger(e) => write!(f, "Ledger error: {}", e),
            ApiError::Webhook(e) => write!(f, "Webhook error: {}", e),
            ApiError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Database(e) => Some(e),
            ApiError::Validation(e) => Some(e),
            ApiError::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

impl ApiError {
    /// Whether a client may retry the same request (same reference) later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::DatabaseConnection(_) | ApiError::Ledger(LedgerError::GatewayUnavailable(_))
        )
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Database(diesel::result::Error::NotFound) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::DatabaseConnection(_) => (StatusCode::SERVICE_UNAVAILABLE, "database_unavailable"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Auth(AuthError::Forbidden) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Token(_) => (StatusCode::INTERNAL_SERVER_ERROR, "token_error"),
            ApiError::Webhook(_) => (StatusCode::BAD_REQUEST, "invalid_webhook"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Ledger(e) => match e {
                LedgerError::InsufficientFunds { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_funds")
                }
                LedgerError::AccountLocked(_) => (StatusCode::UNPROCESSABLE_ENTITY, "account_locked"),
                LedgerError::AccountInactive => (StatusCode::UNPROCESSABLE_ENTITY, "account_inactive"),
                LedgerError::InvalidAmount => (StatusCode::BAD_REQUEST, "invalid_amount"),
                LedgerError::DuplicateReference(_) => (StatusCode::CONFLICT, "duplicate_reference"),
                LedgerError::GatewayUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "gateway_unavailable")
                }
                LedgerError::GatewayRejected(_) => (StatusCode::BAD_GATEWAY, "gateway_rejected"),
                LedgerError::GatewayNotConfigured(_) => {
                    (StatusCode::BAD_REQUEST, "gateway_not_configured")
                }
                LedgerError::AmountMismatch { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "amount_mismatch")
                }
                LedgerError::PaymentNotFound(_) => (StatusCode::NOT_FOUND, "payment_not_found"),
                LedgerError::RepaymentOverAllocation { .. } => {
                    (StatusCode::CONFLICT, "repayment_over_allocation")
                }
                LedgerError::CardProvisioningFailed(_) => {
                    (StatusCode::BAD_GATEWAY, "card_provisioning_failed")
                }
                LedgerError::InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
                LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            },
        }
    }
}

impl From<PoolError> for ApiError {
    fn from(err: PoolError) -> Self {
        ApiError::DatabaseConnection(err.to_string())
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        ApiError::Database(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Ledger(err.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // internals stay in the logs
        let message = match &self {
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Token(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ApiErrorResponse {
                code: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_map_onto_ledger_taxonomy() {
        assert_eq!(
            LedgerError::from(GatewayError::Unavailable("timeout".into())),
            LedgerError::GatewayUnavailable("timeout".into())
        );
        assert_eq!(
            LedgerError::from(GatewayError::Rejected("declined".into())),
            LedgerError::GatewayRejected("declined".into())
        );
        assert!(GatewayError::Unavailable("x".into()).is_retryable());
        assert!(!GatewayError::Rejected("x".into()).is_retryable());
    }

    #[test]
    fn ledger_errors_have_distinct_statuses() {
        let insufficient = ApiError::from(LedgerError::InsufficientFunds {
            balance: 5000,
            requested: 6000,
        });
        assert_eq!(
            insufficient.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let unavailable = ApiError::from(GatewayError::Unavailable("timeout".into()));
        assert!(unavailable.is_retryable());
        assert_eq!(
            unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let duplicate = ApiError::from(LedgerError::DuplicateReference("R1".into()));
        assert_eq!(duplicate.into_response().status(), StatusCode::CONFLICT);

        let forbidden = ApiError::from(AuthError::Forbidden);
        assert_eq!(forbidden.into_response().status(), StatusCode::FORBIDDEN);
    }
}
