use async_trait::async_trait;
use hmac::{Hmac, Mac};
use http::{HeaderMap, StatusCode};
use lendora_primitives::error::GatewayError;
use lendora_primitives::models::enum_types::GatewayProvider;
use lendora_primitives::models::providers::paystack::{
    PaystackInitializeData, PaystackInitializeRequest, PaystackResponse, PaystackVerifyData,
};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use tracing::{debug, warn};

use crate::clients::gateway::{
    transport_error, InitializeTransaction, InitializedTransaction, PaymentGateway,
    VerificationOutcome, VerifiedPayment,
};

pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

type HmacSha512 = Hmac<Sha512>;

#[derive(Clone)]
pub struct PaystackGateway {
    http: Client,
    base_url: Url,
    secret_key: SecretString,
}

impl PaystackGateway {
    pub fn new(http: Client, base_url: &str, secret_key: SecretString) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|_| GatewayError::NotConfigured("invalid Paystack base URL".into()))?;

        Ok(Self {
            http,
            base_url,
            secret_key,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::NotConfigured("invalid Paystack URL path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// HMAC-SHA512 of the raw body, hex encoded.
    pub fn sign(secret: &str, body: &[u8]) -> Option<String> {
        let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(body);
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Maps a verify response onto the outcome taxonomy. Only an explicit
/// `success` confirms; only `failed`/`reversed` reject.
pub fn interpret_verify_response(
    status: StatusCode,
    body: Option<PaystackResponse<PaystackVerifyData>>,
) -> Result<VerificationOutcome, GatewayError> {
    if status.is_server_error() {
        return Err(GatewayError::Unavailable(format!(
            "Paystack returned {}",
            status
        )));
    }

    let Some(body) = body else {
        return Err(GatewayError::Unavailable(
            "Paystack returned an unreadable body".into(),
        ));
    };

    if status == StatusCode::NOT_FOUND
        || (!body.status && body.message.to_lowercase().contains("not found"))
    {
        return Ok(VerificationOutcome::NotYetConfirmed);
    }

    if !status.is_success() || !body.status {
        return Err(GatewayError::Unavailable(body.message));
    }

    let Some(data) = body.data else {
        return Ok(VerificationOutcome::NotYetConfirmed);
    };

    match data.status.as_str() {
        "success" => Ok(VerificationOutcome::Confirmed(VerifiedPayment {
            amount: data.amount,
            currency: data.currency,
            provider_reference: data.id.map(|id| id.to_string()),
        })),
        "failed" | "reversed" => Err(GatewayError::Rejected(
            data.gateway_response.unwrap_or(data.status),
        )),
        other => {
            debug!(reference = %data.reference, status = other, "Paystack payment not final");
            Ok(VerificationOutcome::NotYetConfirmed)
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn provider(&self) -> GatewayProvider {
        GatewayProvider::Paystack
    }

    fn is_configured(&self) -> bool {
        !self.secret_key.expose_secret().trim().is_empty()
    }

    async fn initialize_transaction(
        &self,
        request: InitializeTransaction<'_>,
    ) -> Result<InitializedTransaction, GatewayError> {
        let url = self.endpoint(&["transaction", "initialize"])?;

        let payload = PaystackInitializeRequest {
            email: request.email,
            amount: request.amount,
            reference: request.reference,
            currency: request.currency,
            callback_url: request.callback_url,
            metadata: &request.metadata,
        };

        let resp = self
            .http
            .post(url)
            .bearer_auth(self.secret_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(self.provider(), e))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(GatewayError::Unavailable(format!(
                "Paystack returned {}",
                status
            )));
        }

        let body: PaystackResponse<PaystackInitializeData> = resp
            .json()
            .await
            .map_err(|_| GatewayError::Unavailable("invalid Paystack response".into()))?;

        match body.data {
            Some(data) if status.is_success() && body.status => Ok(InitializedTransaction {
                authorization_url: data.authorization_url,
                provider_transaction_id: data.access_code,
            }),
            _ => {
                warn!(reference = request.reference, %status, message = %body.message, "Paystack initialize refused");
                Err(GatewayError::Rejected(body.message))
            }
        }
    }

    async fn verify_transaction(
        &self,
        reference: &str,
        _provider_transaction_id: Option<&str>,
    ) -> Result<VerificationOutcome, GatewayError> {
        let url = self.endpoint(&["transaction", "verify", reference])?;

        let resp = self
            .http
            .get(url)
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| transport_error(self.provider(), e))?;

        let status = resp.status();
        let body = resp.json::<PaystackResponse<PaystackVerifyData>>().await.ok();

        interpret_verify_response(status, body)
    }

    fn verify_webhook(&self, headers: &HeaderMap, body: &[u8]) -> bool {
        let Some(signature) = headers
            .get(PAYSTACK_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            return false;
        };

        let Ok(signature) = hex::decode(signature.trim()) else {
            return false;
        };

        let Ok(mut mac) = HmacSha512::new_from_slice(self.secret_key.expose_secret().as_bytes())
        else {
            return false;
        };
        mac.update(body);

        // constant-time comparison
        mac.verify_slice(&signature).is_ok()
    }
}
