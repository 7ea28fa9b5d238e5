use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaystackWebhook {
    pub event: String,
    pub data: PaystackWebhookData,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaystackWebhookData {
    pub reference: String,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaystackInitializeRequest<'a> {
    pub email: &'a str,
    /// Minor units (kobo).
    pub amount: i64,
    pub reference: &'a str,
    pub currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<&'a str>,
    pub metadata: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct PaystackResponse<T> {
    pub status: bool,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct PaystackInitializeData {
    pub authorization_url: String,
    pub access_code: Option<String>,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct PaystackVerifyData {
    pub id: Option<i64>,
    pub status: String,
    pub reference: String,
    /// Minor units (kobo).
    pub amount: i64,
    pub currency: String,
    pub gateway_response: Option<String>,
}
