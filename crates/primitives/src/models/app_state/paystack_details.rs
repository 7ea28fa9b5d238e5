use crate::models::app_state::app_config::PaymentMode;
use secrecy::{ExposeSecret, SecretString};
use std::env;

#[derive(Debug, Clone)]
pub struct PaystackInfo {
    pub paystack_secret_key: SecretString,
    pub paystack_public_key: Option<String>,
    pub paystack_api_url: String,
}

impl PaystackInfo {
    /// Picks the live or test key pair according to `mode`. Returns `None` when
    /// no secret key is configured for that mode.
    pub fn from_env(mode: PaymentMode) -> Option<Self> {
        let prefix = mode.env_prefix();

        let secret = env::var(format!("PAYSTACK_{}_SECRET_KEY", prefix))
            .ok()
            .filter(|s| !s.trim().is_empty())?;

        Some(Self {
            paystack_secret_key: SecretString::new(secret.into()),
            paystack_public_key: env::var(format!("PAYSTACK_{}_PUBLIC_KEY", prefix)).ok(),
            paystack_api_url: env::var("PAYSTACK_API_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".into()),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.paystack_secret_key.expose_secret().trim().is_empty()
    }
}
