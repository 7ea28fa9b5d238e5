pub mod app_config;
pub mod card_issuer_details;
pub mod flutterwave_details;
pub mod jwt_details;
pub mod paystack_details;

pub use app_config::*;
pub use card_issuer_details::*;
pub use flutterwave_details::*;
pub use jwt_details::*;
pub use paystack_details::*;
