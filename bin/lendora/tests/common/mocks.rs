use async_trait::async_trait;
use http::HeaderMap;
use lendora_core::clients::{
    CardIssuer, InitializeTransaction, InitializedTransaction, IssuedCard, PaymentGateway,
    VerificationOutcome, VerifiedPayment,
};
use lendora_primitives::error::GatewayError;
use lendora_primitives::models::entities::enum_types::GatewayProvider;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Gateway whose verify answer is set by the test.
pub struct ScriptedGateway {
    provider: GatewayProvider,
    outcome: Mutex<Result<VerificationOutcome, GatewayError>>,
    pub verify_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(provider: GatewayProvider) -> Self {
        Self {
            provider,
            outcome: Mutex::new(Ok(VerificationOutcome::NotYetConfirmed)),
            verify_calls: AtomicUsize::new(0),
        }
    }

    pub fn confirm(&self, amount: i64, currency: &str) {
        self.set(Ok(VerificationOutcome::Confirmed(VerifiedPayment {
            amount,
            currency: currency.to_string(),
            provider_reference: Some(format!("gw-{}", Uuid::new_v4())),
        })));
    }

    pub fn reject(&self, reason: &str) {
        self.set(Err(GatewayError::Rejected(reason.to_string())));
    }

    pub fn go_down(&self) {
        self.set(Err(GatewayError::Unavailable("connection refused".into())));
    }

    pub fn calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    fn set(&self, outcome: Result<VerificationOutcome, GatewayError>) {
        *self.outcome.lock().expect("outcome lock") = outcome;
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    fn provider(&self) -> GatewayProvider {
        self.provider
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn initialize_transaction(
        &self,
        request: InitializeTransaction<'_>,
    ) -> Result<InitializedTransaction, GatewayError> {
        Ok(InitializedTransaction {
            authorization_url: format!("https://checkout.test/{}", request.reference),
            provider_transaction_id: None,
        })
    }

    async fn verify_transaction(
        &self,
        _reference: &str,
        _provider_transaction_id: Option<&str>,
    ) -> Result<VerificationOutcome, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.lock().expect("outcome lock").clone()
    }

    fn verify_webhook(&self, _headers: &HeaderMap, _body: &[u8]) -> bool {
        true
    }
}

/// Card issuer that succeeds unless told to fail movements. Movements can
/// be slowed down to open a window for concurrent callers.
#[derive(Default)]
pub struct MockCardIssuer {
    pub fail_movements: AtomicBool,
    pub delay_ms: AtomicU64,
    pub fund_calls: AtomicUsize,
    pub withdraw_calls: AtomicUsize,
    pub idempotency_keys: Mutex<Vec<String>>,
}

impl MockCardIssuer {
    pub fn failing() -> Self {
        let issuer = Self::default();
        issuer.fail_movements.store(true, Ordering::SeqCst);
        issuer
    }

    pub fn slow(delay: Duration) -> Self {
        let issuer = Self::default();
        issuer.set_delay(delay);
        issuer
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_movements.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        self.idempotency_keys.lock().expect("keys lock").clone()
    }

    async fn movement(&self, idempotency_key: &str) -> Result<(), GatewayError> {
        self.idempotency_keys
            .lock()
            .expect("keys lock")
            .push(idempotency_key.to_string());

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_movements.load(Ordering::SeqCst) {
            Err(GatewayError::Rejected("card declined".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CardIssuer for MockCardIssuer {
    async fn create_card(&self, _currency: &str, _name_on_card: &str) -> Result<IssuedCard, GatewayError> {
        Ok(IssuedCard {
            external_card_id: format!("card-{}", Uuid::new_v4()),
            masked_pan: Some("5399********1234".into()),
        })
    }

    async fn fund_card(
        &self,
        _external_card_id: &str,
        _currency: &str,
        _amount: i64,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        self.fund_calls.fetch_add(1, Ordering::SeqCst);
        self.movement(idempotency_key).await
    }

    async fn withdraw_from_card(
        &self,
        _external_card_id: &str,
        _amount: i64,
        idempotency_key: &str,
    ) -> Result<(), GatewayError> {
        self.withdraw_calls.fetch_add(1, Ordering::SeqCst);
        self.movement(idempotency_key).await
    }

    async fn set_blocked(&self, _external_card_id: &str, _blocked: bool) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn terminate_card(&self, _external_card_id: &str) -> Result<(), GatewayError> {
        Ok(())
    }
}
