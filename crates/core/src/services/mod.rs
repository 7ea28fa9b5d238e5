pub mod audit_service;
pub mod card_service;
pub mod ledger_service;
pub mod loan_service;
pub mod payment_service;
pub mod reconciliation_service;
pub mod repayment_allocator;
pub mod savings_service;
pub mod transfer_request_service;
pub mod wallet_service;
pub mod webhook_service;
