use async_trait::async_trait;
use http::HeaderMap;
use lendora_primitives::error::GatewayError;
use lendora_primitives::models::app_state::AppConfig;
use lendora_primitives::models::enum_types::GatewayProvider;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::flutterwave::FlutterwaveGateway;
use crate::clients::paystack::PaystackGateway;

#[derive(Debug, Clone)]
pub struct InitializeTransaction<'a> {
    pub email: &'a str,
    /// Minor units.
    pub amount: i64,
    pub currency: &'a str,
    pub reference: &'a str,
    pub callback_url: Option<&'a str>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub provider_transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    /// Minor units, already converted from the provider's representation.
    pub amount: i64,
    pub currency: String,
    pub provider_reference: Option<String>,
}

/// What the provider says about a payment. A definitive failure is not an
/// outcome but `GatewayError::Rejected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Confirmed(VerifiedPayment),
    /// Anything short of an explicit success. Money may still move.
    NotYetConfirmed,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> GatewayProvider;

    fn is_configured(&self) -> bool;

    async fn initialize_transaction(
        &self,
        request: InitializeTransaction<'_>,
    ) -> Result<InitializedTransaction, GatewayError>;

    async fn verify_transaction(
        &self,
        reference: &str,
        provider_transaction_id: Option<&str>,
    ) -> Result<VerificationOutcome, GatewayError>;

    /// Authenticates an inbound webhook delivery against the raw body.
    fn verify_webhook(&self, headers: &HeaderMap, body: &[u8]) -> bool;
}

/// One adapter per configured provider, chosen by `Payment.gateway`.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<GatewayProvider, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(http: &Client, config: &AppConfig) -> Result<Self, GatewayError> {
        let mut registry = Self::new();

        match &config.paystack_details {
            Some(details) => registry.register(Arc::new(PaystackGateway::new(
                http.clone(),
                &details.paystack_api_url,
                details.paystack_secret_key.clone(),
            )?)),
            None => warn!(mode = ?config.payment_mode, "Paystack keys not configured"),
        }

        match &config.flutterwave_details {
            Some(details) => registry.register(Arc::new(FlutterwaveGateway::new(
                http.clone(),
                &details.flutterwave_api_url,
                details.flutterwave_secret_key.clone(),
                details.flutterwave_secret_hash.clone(),
            )?)),
            None => warn!(mode = ?config.payment_mode, "Flutterwave keys not configured"),
        }

        info!(gateways = ?registry.configured(), "Payment gateways registered");
        Ok(registry)
    }

    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        self.gateways.insert(gateway.provider(), gateway);
    }

    pub fn get(&self, provider: GatewayProvider) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
        self.gateways
            .get(&provider)
            .filter(|g| g.is_configured())
            .cloned()
            .ok_or_else(|| GatewayError::NotConfigured(provider.to_string()))
    }

    pub fn configured(&self) -> Vec<GatewayProvider> {
        let mut providers: Vec<_> = self
            .gateways
            .values()
            .filter(|g| g.is_configured())
            .map(|g| g.provider())
            .collect();
        providers.sort_by_key(|p| p.to_string());
        providers
    }
}

pub(crate) fn transport_error(provider: GatewayProvider, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        warn!(%provider, "Gateway call timed out");
        GatewayError::Unavailable(format!("{} timed out", provider))
    } else {
        warn!(%provider, error = %err, "Gateway call failed");
        GatewayError::Unavailable(format!("{} unreachable", provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn unregistered_provider_is_not_configured() {
        let registry = GatewayRegistry::new();
        assert_eq!(
            registry.get(GatewayProvider::Paystack).err(),
            Some(GatewayError::NotConfigured("paystack".into()))
        );
    }

    #[test]
    fn registry_resolves_by_provider() {
        let mut registry = GatewayRegistry::new();
        let paystack = PaystackGateway::new(
            Client::new(),
            "http://localhost:9999",
            SecretString::new("sk_test_x".into()),
        )
        .unwrap();
        registry.register(Arc::new(paystack));

        let gateway = registry.get(GatewayProvider::Paystack).unwrap();
        assert_eq!(gateway.provider(), GatewayProvider::Paystack);
        assert!(registry.get(GatewayProvider::Flutterwave).is_err());
        assert_eq!(registry.configured(), vec![GatewayProvider::Paystack]);
    }
}
