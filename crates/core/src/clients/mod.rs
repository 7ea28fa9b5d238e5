pub mod card_issuer;
pub mod flutterwave;
pub mod gateway;
pub mod paystack;

pub use card_issuer::{CardIssuer, HttpCardIssuer, IssuedCard, UnconfiguredCardIssuer};
pub use flutterwave::FlutterwaveGateway;
pub use gateway::{
    GatewayRegistry, InitializeTransaction, InitializedTransaction, PaymentGateway,
    VerificationOutcome, VerifiedPayment,
};
pub use paystack::PaystackGateway;
