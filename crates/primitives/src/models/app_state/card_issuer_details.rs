use secrecy::SecretString;
use std::env;

#[derive(Debug, Clone)]
pub struct CardIssuerInfo {
    pub card_issuer_api_url: String,
    pub card_issuer_secret_key: SecretString,
}

impl CardIssuerInfo {
    pub fn from_env() -> Option<Self> {
        let secret = env::var("CARD_ISSUER_SECRET_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())?;

        Some(Self {
            card_issuer_api_url: env::var("CARD_ISSUER_API_URL")
                .unwrap_or_else(|_| "https://api.flutterwave.com/v3".into()),
            card_issuer_secret_key: SecretString::new(secret.into()),
        })
    }
}
