use crate::models::app_state::card_issuer_details::CardIssuerInfo;
use crate::models::app_state::flutterwave_details::FlutterwaveInfo;
use crate::models::app_state::jwt_details::JWTInfo;
use crate::models::app_state::paystack_details::PaystackInfo;
use crate::models::entities::enum_types::CurrencyCode;
use eyre::{eyre, Report};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMode {
    Live,
    Test,
}

impl PaymentMode {
    pub fn env_prefix(self) -> &'static str {
        match self {
            PaymentMode::Live => "LIVE",
            PaymentMode::Test => "TEST",
        }
    }
}

impl FromStr for PaymentMode {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(PaymentMode::Live),
            "test" => Ok(PaymentMode::Test),
            other => Err(eyre!("Invalid PAYMENT_MODE: {}", other)),
        }
    }
}

/// Fee schedule applied at loan origination.
#[derive(Debug, Clone, Copy)]
pub struct FeeSchedule {
    pub loan_admin_fee_bps: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_env: String,

    pub app_url: String,

    pub jwt_details: JWTInfo,

    pub payment_mode: PaymentMode,

    pub default_currency: CurrencyCode,

    pub paystack_details: Option<PaystackInfo>,

    pub flutterwave_details: Option<FlutterwaveInfo>,

    pub card_issuer_details: Option<CardIssuerInfo>,

    pub fees: FeeSchedule,

    pub gateway_timeout_secs: u64,

    pub pending_sweep_interval_secs: u64,

    pub pending_sweep_min_age_secs: i64,

    pub rate_limit_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Report> {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let payment_mode: PaymentMode = env::var("PAYMENT_MODE")
            .unwrap_or_else(|_| "test".into())
            .parse()?;

        let default_currency = CurrencyCode::parse(
            &env::var("DEFAULT_CURRENCY").unwrap_or_else(|_| "NGN".into()),
        )
        .map_err(|e| eyre!("{}", e))?;

        Ok(Self {
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8080".into()),

            jwt_details: JWTInfo::new()?,

            payment_mode,

            default_currency,

            paystack_details: PaystackInfo::from_env(payment_mode),

            flutterwave_details: FlutterwaveInfo::from_env(payment_mode),

            card_issuer_details: CardIssuerInfo::from_env(),

            fees: FeeSchedule {
                loan_admin_fee_bps: parse_env("LOAN_ADMIN_FEE_BPS", 100)?,
            },

            gateway_timeout_secs: parse_env("GATEWAY_TIMEOUT_SECS", 30)?,

            pending_sweep_interval_secs: parse_env("PENDING_SWEEP_INTERVAL_SECS", 300)?,

            pending_sweep_min_age_secs: parse_env("PENDING_SWEEP_MIN_AGE_SECS", 600)?,

            rate_limit_enabled: match env::var("RATE_LIMIT_ENABLED") {
                Ok(v) => v.parse()?,
                Err(_) => app_env != "test",
            },

            app_env,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, Report>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| eyre!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
