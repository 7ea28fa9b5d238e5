use async_trait::async_trait;
use lendora_primitives::error::GatewayError;
use lendora_primitives::models::providers::card_issuer::{
    CardAmountPayload, CardIssuerCardData, CardIssuerResponse, CreateVirtualCardRequest,
};
use lendora_primitives::money::format_major_units;
use reqwest::{Client, Method, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCard {
    pub external_card_id: String,
    pub masked_pan: Option<String>,
}

/// External virtual-card provider. Amounts are minor units.
///
/// Money-moving calls carry the movement reference as an idempotency key, so
/// a retried call after a timeout is recognised by the issuer instead of
/// moving the funds twice.
#[async_trait]
pub trait CardIssuer: Send + Sync {
    async fn create_card(&self, currency: &str, name_on_card: &str) -> Result<IssuedCard, GatewayError>;

    async fn fund_card(
        &self,
        external_card_id: &str,
        currency: &str,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), GatewayError>;

    async fn withdraw_from_card(
        &self,
        external_card_id: &str,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), GatewayError>;

    async fn set_blocked(&self, external_card_id: &str, blocked: bool) -> Result<(), GatewayError>;

    async fn terminate_card(&self, external_card_id: &str) -> Result<(), GatewayError>;
}

#[derive(Clone)]
pub struct HttpCardIssuer {
    http: Client,
    base_url: Url,
    secret_key: SecretString,
}

impl HttpCardIssuer {
    pub fn new(http: Client, base_url: &str, secret_key: SecretString) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|_| GatewayError::NotConfigured("invalid card issuer base URL".into()))?;

        Ok(Self {
            http,
            base_url,
            secret_key,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::NotConfigured("invalid card issuer URL path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        idempotency_key: Option<&str>,
    ) -> Result<Option<T>, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(self.secret_key.expose_secret());

        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Unavailable("card issuer timed out".into())
            } else {
                GatewayError::Unavailable(format!("card issuer unreachable: {}", e))
            }
        })?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(GatewayError::Unavailable(format!(
                "card issuer returned {}",
                status
            )));
        }

        let body: CardIssuerResponse<T> = resp
            .json()
            .await
            .map_err(|_| GatewayError::Unavailable("invalid card issuer response".into()))?;

        if !status.is_success() || body.status != "success" {
            warn!(%status, message = %body.message, "Card issuer refused request");
            return Err(GatewayError::Rejected(body.message));
        }

        Ok(body.data)
    }
}

#[async_trait]
impl CardIssuer for HttpCardIssuer {
    async fn create_card(&self, currency: &str, name_on_card: &str) -> Result<IssuedCard, GatewayError> {
        let payload = CreateVirtualCardRequest {
            currency,
            amount: format_major_units(0),
            billing_name: name_on_card,
        };

        let data: CardIssuerCardData = self
            .call(Method::POST, &["virtual-cards"], Some(&payload), None)
            .await?
            .ok_or_else(|| GatewayError::Unavailable("card issuer returned no card".into()))?;

        Ok(IssuedCard {
            external_card_id: data.id,
            masked_pan: data.masked_pan,
        })
    }

    async fn fund_card(
        &self,
        external_card_id: &str,
        currency: &str,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        let payload = CardAmountPayload {
            debit_currency: currency,
            amount: format_major_units(amount),
        };

        self.call::<_, serde_json::Value>(
            Method::POST,
            &["virtual-cards", external_card_id, "fund"],
            Some(&payload),
            Some(idempotency_key),
        )
        .await?;
        Ok(())
    }

    async fn withdraw_from_card(
        &self,
        external_card_id: &str,
        amount: i64,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        let payload = serde_json::json!({ "amount": format_major_units(amount) });

        self.call::<_, serde_json::Value>(
            Method::POST,
            &["virtual-cards", external_card_id, "withdraw"],
            Some(&payload),
            Some(idempotency_key),
        )
        .await?;
        Ok(())
    }

    async fn set_blocked(&self, external_card_id: &str, blocked: bool) -> Result<(), GatewayError> {
        let action = if blocked { "block" } else { "unblock" };

        self.call::<(), serde_json::Value>(
            Method::PUT,
            &["virtual-cards", external_card_id, "status", action],
            None,
            None,
        )
        .await?;
        Ok(())
    }

    async fn terminate_card(&self, external_card_id: &str) -> Result<(), GatewayError> {
        self.call::<(), serde_json::Value>(
            Method::PUT,
            &["virtual-cards", external_card_id, "terminate"],
            None,
            None,
        )
        .await?;
        Ok(())
    }
}

/// Stand-in used when no issuer is configured; every call fails as not configured.
pub struct UnconfiguredCardIssuer;

#[async_trait]
impl CardIssuer for UnconfiguredCardIssuer {
    async fn create_card(&self, _: &str, _: &str) -> Result<IssuedCard, GatewayError> {
        Err(GatewayError::NotConfigured("card issuer".into()))
    }

    async fn fund_card(&self, _: &str, _: &str, _: i64, _: &str) -> Result<(), GatewayError> {
        Err(GatewayError::NotConfigured("card issuer".into()))
    }

    async fn withdraw_from_card(&self, _: &str, _: i64, _: &str) -> Result<(), GatewayError> {
        Err(GatewayError::NotConfigured("card issuer".into()))
    }

    async fn set_blocked(&self, _: &str, _: bool) -> Result<(), GatewayError> {
        Err(GatewayError::NotConfigured("card issuer".into()))
    }

    async fn terminate_card(&self, _: &str) -> Result<(), GatewayError> {
        Err(GatewayError::NotConfigured("card issuer".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn issuer(server: &MockServer) -> HttpCardIssuer {
        HttpCardIssuer::new(Client::new(), &server.uri(), SecretString::new("sk".into())).unwrap()
    }

    #[tokio::test]
    async fn create_card_returns_external_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/virtual-cards"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "message": "Card created successfully",
                "data": { "id": "card-123", "masked_pan": "531993*******7071", "currency": "NGN" }
            })))
            .mount(&server)
            .await;

        let card = issuer(&server).create_card("NGN", "Ada Obi").await.unwrap();
        assert_eq!(card.external_card_id, "card-123");
        assert_eq!(card.masked_pan.as_deref(), Some("531993*******7071"));
    }

    #[tokio::test]
    async fn fund_sends_major_units() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/virtual-cards/card-123/fund"))
            .and(body_partial_json(json!({ "amount": "20.00", "debit_currency": "NGN" })))
            .and(header("Idempotency-Key", "CF-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "message": "Card funded successfully",
                "data": null
            })))
            .mount(&server)
            .await;

        issuer(&server).fund_card("card-123", "NGN", 2000, "CF-1").await.unwrap();
    }

    #[tokio::test]
    async fn withdrawal_carries_the_movement_reference() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/virtual-cards/card-123/withdraw"))
            .and(body_partial_json(json!({ "amount": "7.50" })))
            .and(header("Idempotency-Key", "card-terminate:abc#2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "message": "Withdrawal successful",
                "data": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        issuer(&server)
            .withdraw_from_card("card-123", 750, "card-terminate:abc#2")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn declined_funding_is_rejected_and_outage_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/virtual-cards/declined/fund"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "error",
                "message": "Insufficient balance in issuing wallet",
                "data": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/virtual-cards/down/fund"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let issuer = issuer(&server);
        assert!(matches!(
            issuer.fund_card("declined", "NGN", 2000, "CF-2").await,
            Err(GatewayError::Rejected(_))
        ));
        assert!(issuer
            .fund_card("down", "NGN", 2000, "CF-3")
            .await
            .unwrap_err()
            .is_retryable());
    }

    #[tokio::test]
    async fn block_uses_status_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/virtual-cards/card-123/status/block"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "message": "Card blocked",
                "data": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        issuer(&server).set_blocked("card-123", true).await.unwrap();
    }

    #[tokio::test]
    async fn unconfigured_issuer_refuses() {
        let err = UnconfiguredCardIssuer.fund_card("x", "NGN", 1, "k").await.unwrap_err();
        assert_eq!(err, GatewayError::NotConfigured("card issuer".into()));
    }
}
