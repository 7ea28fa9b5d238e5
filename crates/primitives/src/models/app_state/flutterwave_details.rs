use crate::models::app_state::app_config::PaymentMode;
use secrecy::{ExposeSecret, SecretString};
use std::env;

#[derive(Debug, Clone)]
pub struct FlutterwaveInfo {
    pub flutterwave_secret_key: SecretString,
    pub flutterwave_public_key: Option<String>,
    /// Value Flutterwave echoes in the `verif-hash` webhook header.
    pub flutterwave_secret_hash: Option<SecretString>,
    pub flutterwave_api_url: String,
}

impl FlutterwaveInfo {
    pub fn from_env(mode: PaymentMode) -> Option<Self> {
        let prefix = mode.env_prefix();

        let secret = env::var(format!("FLUTTERWAVE_{}_SECRET_KEY", prefix))
            .ok()
            .filter(|s| !s.trim().is_empty())?;

        Some(Self {
            flutterwave_secret_key: SecretString::new(secret.into()),
            flutterwave_public_key: env::var(format!("FLUTTERWAVE_{}_PUBLIC_KEY", prefix)).ok(),
            flutterwave_secret_hash: env::var("FLUTTERWAVE_SECRET_HASH")
                .ok()
                .map(|h| SecretString::new(h.into())),
            flutterwave_api_url: env::var("FLUTTERWAVE_API_URL")
                .unwrap_or_else(|_| "https://api.flutterwave.com/v3".into()),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.flutterwave_secret_key.expose_secret().trim().is_empty()
    }
}
