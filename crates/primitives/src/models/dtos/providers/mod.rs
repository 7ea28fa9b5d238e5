pub mod card_issuer;
pub mod flutterwave;
pub mod paystack;
