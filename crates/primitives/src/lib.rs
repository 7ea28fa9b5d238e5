pub mod error;
pub mod models;
pub mod money;
pub mod schema;
