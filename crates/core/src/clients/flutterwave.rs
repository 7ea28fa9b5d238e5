use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use lendora_primitives::error::GatewayError;
use lendora_primitives::models::enum_types::GatewayProvider;
use lendora_primitives::models::providers::flutterwave::{
    FlutterwaveCustomer, FlutterwavePaymentLink, FlutterwavePaymentRequest, FlutterwaveResponse,
    FlutterwaveVerifyData,
};
use lendora_primitives::money::{format_major_units, parse_major_units};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::clients::gateway::{
    transport_error, InitializeTransaction, InitializedTransaction, PaymentGateway,
    VerificationOutcome, VerifiedPayment,
};

pub const FLUTTERWAVE_SIGNATURE_HEADER: &str = "verif-hash";

#[derive(Clone)]
pub struct FlutterwaveGateway {
    http: Client,
    base_url: Url,
    secret_key: SecretString,
    secret_hash: Option<SecretString>,
}

impl FlutterwaveGateway {
    pub fn new(
        http: Client,
        base_url: &str,
        secret_key: SecretString,
        secret_hash: Option<SecretString>,
    ) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|_| GatewayError::NotConfigured("invalid Flutterwave base URL".into()))?;

        Ok(Self {
            http,
            base_url,
            secret_key,
            secret_hash,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::NotConfigured("invalid Flutterwave URL path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Flutterwave reports amounts in major units. `tx_ref` must match the
/// reference being reconciled, otherwise a client could point a payment at
/// someone else's successful transaction id.
pub fn interpret_verify_response(
    reference: &str,
    status: StatusCode,
    body: Option<FlutterwaveResponse<FlutterwaveVerifyData>>,
) -> Result<VerificationOutcome, GatewayError> {
    if status.is_server_error() {
        return Err(GatewayError::Unavailable(format!(
            "Flutterwave returned {}",
            status
        )));
    }

    let Some(body) = body else {
        return Err(GatewayError::Unavailable(
            "Flutterwave returned an unreadable body".into(),
        ));
    };

    if status == StatusCode::NOT_FOUND || body.message.to_lowercase().contains("no transaction") {
        return Ok(VerificationOutcome::NotYetConfirmed);
    }

    if !status.is_success() || body.status != "success" {
        return Err(GatewayError::Unavailable(body.message));
    }

    let Some(data) = body.data else {
        return Ok(VerificationOutcome::NotYetConfirmed);
    };

    if data.tx_ref != reference {
        warn!(reference, tx_ref = %data.tx_ref, "Flutterwave transaction belongs to another reference");
        return Ok(VerificationOutcome::NotYetConfirmed);
    }

    match data.status.as_str() {
        "successful" => {
            let amount = parse_major_units(&data.amount.to_string()).ok_or_else(|| {
                GatewayError::Unavailable(format!("unparseable amount {}", data.amount))
            })?;

            Ok(VerificationOutcome::Confirmed(VerifiedPayment {
                amount,
                currency: data.currency,
                provider_reference: Some(data.id.to_string()),
            }))
        }
        "failed" => Err(GatewayError::Rejected(format!(
            "transaction {} failed",
            data.flw_ref.unwrap_or_else(|| data.id.to_string())
        ))),
        other => {
            debug!(reference, status = other, "Flutterwave payment not final");
            Ok(VerificationOutcome::NotYetConfirmed)
        }
    }
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    fn provider(&self) -> GatewayProvider {
        GatewayProvider::Flutterwave
    }

    fn is_configured(&self) -> bool {
        !self.secret_key.expose_secret().trim().is_empty()
    }

    async fn initialize_transaction(
        &self,
        request: InitializeTransaction<'_>,
    ) -> Result<InitializedTransaction, GatewayError> {
        let url = self.endpoint(&["payments"])?;

        let payload = FlutterwavePaymentRequest {
            tx_ref: request.reference,
            amount: format_major_units(request.amount),
            currency: request.currency,
            redirect_url: request.callback_url,
            customer: FlutterwaveCustomer {
                email: request.email,
            },
            meta: &request.metadata,
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
                "Flutterwave returned {}",
                status
            )));
        }

        let body: FlutterwaveResponse<FlutterwavePaymentLink> = resp
            .json()
            .await
            .map_err(|_| GatewayError::Unavailable("invalid Flutterwave response".into()))?;

        match body.data {
            Some(data) if status.is_success() && body.status == "success" => {
                Ok(InitializedTransaction {
                    authorization_url: data.link,
                    provider_transaction_id: None,
                })
            }
            _ => {
                warn!(reference = request.reference, %status, message = %body.message, "Flutterwave initialize refused");
                Err(GatewayError::Rejected(body.message))
            }
        }
    }

    async fn verify_transaction(
        &self,
        reference: &str,
        provider_transaction_id: Option<&str>,
    ) -> Result<VerificationOutcome, GatewayError> {
        let url = match provider_transaction_id {
            Some(id) => self.endpoint(&["transactions", id, "verify"])?,
            None => {
                let mut url = self.endpoint(&["transactions", "verify_by_reference"])?;
                url.query_pairs_mut().append_pair("tx_ref", reference);
                url
            }
        };

        let resp = self
            .http
            .get(url)
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| transport_error(self.provider(), e))?;

        let status = resp.status();
        let body = resp
            .json::<FlutterwaveResponse<FlutterwaveVerifyData>>()
            .await
            .ok();

        interpret_verify_response(reference, status, body)
    }

    fn verify_webhook(&self, headers: &HeaderMap, _body: &[u8]) -> bool {
        let Some(expected) = &self.secret_hash else {
            warn!("FLUTTERWAVE_SECRET_HASH not set; rejecting webhook");
            return false;
        };

        headers
            .get(FLUTTERWAVE_SIGNATURE_HEADER)
            .map(|v| {
                v.as_bytes()
                    .ct_eq(expected.expose_secret().as_bytes())
                    .into()
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> FlutterwaveGateway {
        FlutterwaveGateway::new(
            Client::new(),
            &server.uri(),
            SecretString::new("FLWSECK_TEST-x".into()),
            Some(SecretString::new("hook-hash".into())),
        )
        .unwrap()
    }

    fn verify_body(tx_ref: &str, status: &str, amount: serde_json::Value) -> serde_json::Value {
        json!({
            "status": "success",
            "message": "Transaction fetched successfully",
            "data": {
                "id": 288200108,
                "tx_ref": tx_ref,
                "flw_ref": "FLW-MOCK-1",
                "amount": amount,
                "currency": "NGN",
                "status": status
            }
        })
    }

    #[tokio::test]
    async fn verify_by_id_converts_major_units() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions/288200108/verify"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(verify_body("R1", "successful", json!(5000.5))),
            )
            .mount(&server)
            .await;

        let outcome = gateway(&server)
            .verify_transaction("R1", Some("288200108"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            VerificationOutcome::Confirmed(VerifiedPayment {
                amount: 500_050,
                currency: "NGN".into(),
                provider_reference: Some("288200108".into()),
            })
        );
    }

    #[tokio::test]
    async fn verify_without_id_uses_reference_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions/verify_by_reference"))
            .and(query_param("tx_ref", "R1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(verify_body("R1", "successful", json!(5000))),
            )
            .mount(&server)
            .await;

        let outcome = gateway(&server).verify_transaction("R1", None).await.unwrap();
        assert!(matches!(
            outcome,
            VerificationOutcome::Confirmed(VerifiedPayment { amount: 500_000, .. })
        ));
    }

    #[tokio::test]
    async fn transaction_for_other_reference_is_not_confirmed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions/288200108/verify"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(verify_body("SOMEONE-ELSE", "successful", json!(5000))),
            )
            .mount(&server)
            .await;

        let outcome = gateway(&server)
            .verify_transaction("R1", Some("288200108"))
            .await
            .unwrap();
        assert_eq!(outcome, VerificationOutcome::NotYetConfirmed);
    }

    #[tokio::test]
    async fn failed_and_pending_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transactions/1/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verify_body("R1", "failed", json!(10))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/transactions/2/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verify_body("R1", "pending", json!(10))))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        assert!(matches!(
            gateway.verify_transaction("R1", Some("1")).await,
            Err(GatewayError::Rejected(_))
        ));
        assert_eq!(
            gateway.verify_transaction("R1", Some("2")).await.unwrap(),
            VerificationOutcome::NotYetConfirmed
        );
    }

    #[tokio::test]
    async fn initialize_sends_two_decimal_major_units() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payments"))
            .and(body_partial_json(json!({ "tx_ref": "R1", "amount": "5000.00" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "message": "Hosted Link",
                "data": { "link": "https://checkout.flutterwave.com/v3/hosted/pay/abc" }
            })))
            .mount(&server)
            .await;

        let init = gateway(&server)
            .initialize_transaction(InitializeTransaction {
                email: "ada@example.com",
                amount: 500_000,
                currency: "NGN",
                reference: "R1",
                callback_url: Some("https://app.example.com/cb"),
                metadata: json!({ "payment_type": "wallet_funding" }),
            })
            .await
            .unwrap();

        assert_eq!(
            init.authorization_url,
            "https://checkout.flutterwave.com/v3/hosted/pay/abc"
        );
    }

    #[tokio::test]
    async fn webhook_hash_must_match() {
        let server = MockServer::start().await;
        let gateway = gateway(&server);

        let mut headers = HeaderMap::new();
        headers.insert(FLUTTERWAVE_SIGNATURE_HEADER, "hook-hash".parse().unwrap());
        assert!(gateway.verify_webhook(&headers, b"{}"));

        headers.insert(FLUTTERWAVE_SIGNATURE_HEADER, "hook-hasx".parse().unwrap());
        assert!(!gateway.verify_webhook(&headers, b"{}"));
        assert!(!gateway.verify_webhook(&HeaderMap::new(), b"{}"));
    }
}
