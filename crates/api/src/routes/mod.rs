//! HTTP route handlers.

pub mod health;
pub mod redeem;
pub mod reply;
pub mod requests;
