pub mod audit_repository;
pub mod card_movement_repository;
pub mod card_repository;
pub mod journal_repository;
pub mod loan_repository;
pub mod payment_repository;
pub mod repayment_repository;
pub mod savings_repository;
pub mod transfer_request_repository;
pub mod user_repository;
pub mod wallet_repository;
