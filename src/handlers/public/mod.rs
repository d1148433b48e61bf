// handlers/public/mod.rs - endpoints reachable without a token
pub mod auth;
pub mod health;

pub use health::{api_index_get, health_get, not_found};
