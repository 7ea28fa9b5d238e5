pub mod admin;
pub mod cards;
pub mod health;
pub mod loans;
pub mod payments;
pub mod savings;
pub mod transfer_requests;
pub mod wallet;
pub mod webhooks;
