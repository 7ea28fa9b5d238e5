use diesel::r2d2::{self, ConnectionManager};
use diesel::PgConnection;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

use crate::clients::{CardIssuer, GatewayRegistry, HttpCardIssuer, UnconfiguredCardIssuer};
use eyre::Result;
pub use lendora_primitives::models::app_config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub gateways: GatewayRegistry,
    pub card_issuer: Arc<dyn CardIssuer>,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Result<Arc<Self>> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.gateway_timeout_secs))
            .build()?;

        let gateways = GatewayRegistry::from_config(&http, &config)?;

        let card_issuer: Arc<dyn CardIssuer> = match &config.card_issuer_details {
            Some(details) => Arc::new(HttpCardIssuer::new(
                http.clone(),
                &details.card_issuer_api_url,
                details.card_issuer_secret_key.clone(),
            )?),
            None => Arc::new(UnconfiguredCardIssuer),
        };

        Ok(Arc::new(Self {
            db,
            config,
            gateways,
            card_issuer,
        }))
    }

    /// Assembles state from pre-built collaborators; used by tests to inject
    /// mock gateways and issuers.
    pub fn with_collaborators(
        db: DbPool,
        config: AppConfig,
        gateways: GatewayRegistry,
        card_issuer: Arc<dyn CardIssuer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            config,
            gateways,
            card_issuer,
        })
    }
}
