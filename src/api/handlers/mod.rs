//! API handlers for the account identity service.

pub mod auth;
pub mod health;
pub mod root;
