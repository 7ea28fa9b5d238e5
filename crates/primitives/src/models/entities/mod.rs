pub mod audit_log;
pub mod card_movement;
pub mod enum_types;
pub mod loan;
pub mod payment;
pub mod savings;
pub mod transfer_request;
pub mod user;
pub mod virtual_card;
pub mod wallet;
pub mod wallet_transaction;
