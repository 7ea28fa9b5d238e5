pub mod card_dto;
pub mod health;
pub mod loan_dto;
pub mod payment_dto;
pub mod providers;
pub mod savings_dto;
pub mod transfer_request_dto;
pub mod wallet_dto;

pub use card_dto::*;
pub use health::*;
pub use loan_dto::*;
pub use payment_dto::*;
pub use savings_dto::*;
pub use transfer_request_dto::*;
pub use wallet_dto::*;
