use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct FlutterwaveWebhook {
    pub event: Option<String>,
    pub data: FlutterwaveWebhookData,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FlutterwaveWebhookData {
    pub id: Option<i64>,
    pub tx_ref: String,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FlutterwaveCustomer<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct FlutterwavePaymentRequest<'a> {
    pub tx_ref: &'a str,
    /// Major units with two decimals, e.g. `"50.00"`.
    pub amount: String,
    pub currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<&'a str>,
    pub customer: FlutterwaveCustomer<'a>,
    pub meta: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct FlutterwaveResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct FlutterwavePaymentLink {
    pub link: String,
}

#[derive(Debug, Deserialize)]
pub struct FlutterwaveVerifyData {
    pub id: i64,
    pub tx_ref: String,
    pub flw_ref: Option<String>,
    /// Major units as a JSON number.
    pub amount: serde_json::Number,
    pub currency: String,
    pub status: String,
}
