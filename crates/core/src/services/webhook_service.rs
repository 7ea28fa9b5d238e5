use crate::app_state::AppState;
use crate::services::reconciliation_service::ReconciliationService;
use http::HeaderMap;
use lendora_primitives::error::{ApiError, LedgerError};
use lendora_primitives::models::dtos::providers::flutterwave::FlutterwaveWebhook;
use lendora_primitives::models::dtos::providers::paystack::PaystackWebhook;
use lendora_primitives::models::enum_types::GatewayProvider;
use tracing::{debug, info, warn};

const PAYSTACK_CHARGE_SUCCESS: &str = "charge.success";

/// The payment a webhook delivery points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookTarget {
    pub reference: String,
    pub provider_transaction_id: Option<String>,
}

/// Extracts the payment to reconcile, or `None` for events we ignore.
/// The payload is only a hint; reconcile asks the gateway for the truth.
pub fn webhook_target(provider: GatewayProvider, body: &[u8]) -> Result<Option<WebhookTarget>, ApiError> {
    match provider {
        GatewayProvider::Paystack => {
            let payload: PaystackWebhook = serde_json::from_slice(body)
                .map_err(|_| ApiError::Webhook("Invalid webhook payload".into()))?;

            if payload.event != PAYSTACK_CHARGE_SUCCESS {
                return Ok(None);
            }

            Ok(Some(WebhookTarget {
                reference: payload.data.reference,
                provider_transaction_id: None,
            }))
        }
        GatewayProvider::Flutterwave => {
            let payload: FlutterwaveWebhook = serde_json::from_slice(body)
                .map_err(|_| ApiError::Webhook("Invalid webhook payload".into()))?;

            Ok(Some(WebhookTarget {
                reference: payload.data.tx_ref,
                provider_transaction_id: payload.data.id.map(|id| id.to_string()),
            }))
        }
    }
}

pub struct WebhookService;

impl WebhookService {
    /// Authenticates the delivery and reconciles the payment it names.
    ///
    /// Returns `Err` only for bad signatures and for failures the provider
    /// should retry; everything else is acknowledged.
    pub async fn handle(
        state: &AppState,
        provider: GatewayProvider,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<(), ApiError> {
        let gateway = state.gateways.get(provider)?;

        if !gateway.verify_webhook(headers, body) {
            warn!(%provider, "webhook: signature rejected");
            return Err(ApiError::Webhook("Invalid webhook signature".into()));
        }

        let Some(target) = webhook_target(provider, body)? else {
            debug!(%provider, "webhook: event ignored");
            return Ok(());
        };

        match ReconciliationService::reconcile(
            state,
            &target.reference,
            target.provider_transaction_id.as_deref(),
        )
        .await
        {
            Ok(result) => {
                info!(
                    %provider,
                    reference = %target.reference,
                    status = %result.payment.status,
                    "webhook: reconciled"
                );
                Ok(())
            }
            Err(e) if e.is_retryable() => {
                warn!(%provider, reference = %target.reference, error = %e, "webhook: retryable failure");
                Err(e)
            }
            Err(ApiError::Ledger(LedgerError::PaymentNotFound(reference))) => {
                warn!(%provider, %reference, "webhook: unknown payment reference");
                Ok(())
            }
            Err(e) => {
                warn!(%provider, reference = %target.reference, error = %e, "webhook: acknowledged with error");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paystack_charge_success_targets_reference() {
        let body = br#"{"event":"charge.success","data":{"reference":"FUND-0001","currency":"NGN"}}"#;
        let target = webhook_target(GatewayProvider::Paystack, body).unwrap();
        assert_eq!(
            target,
            Some(WebhookTarget {
                reference: "FUND-0001".into(),
                provider_transaction_id: None,
            })
        );
    }

    #[test]
    fn other_paystack_events_are_ignored() {
        let body = br#"{"event":"transfer.success","data":{"reference":"TRF-1"}}"#;
        assert_eq!(webhook_target(GatewayProvider::Paystack, body).unwrap(), None);
    }

    #[test]
    fn flutterwave_carries_transaction_id() {
        let body = br#"{"event":"charge.completed","data":{"id":4512,"tx_ref":"FUND-0002","status":"successful"}}"#;
        let target = webhook_target(GatewayProvider::Flutterwave, body).unwrap().unwrap();
        assert_eq!(target.reference, "FUND-0002");
        assert_eq!(target.provider_transaction_id.as_deref(), Some("4512"));
    }

    #[test]
    fn malformed_payload_is_a_webhook_error() {
        let err = webhook_target(GatewayProvider::Paystack, b"not json").unwrap_err();
        assert!(matches!(err, ApiError::Webhook(_)));
    }
}
