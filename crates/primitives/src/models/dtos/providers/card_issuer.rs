use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct CreateVirtualCardRequest<'a> {
    pub currency: &'a str,
    /// Opening balance in major units; cards always start empty.
    pub amount: String,
    pub billing_name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CardAmountPayload<'a> {
    pub debit_currency: &'a str,
    /// Major units with two decimals.
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct CardIssuerResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct CardIssuerCardData {
    pub id: String,
    pub masked_pan: Option<String>,
    pub currency: Option<String>,
}
