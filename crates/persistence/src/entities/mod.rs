//! Database entity definitions.

pub mod access_request;

pub use access_request::{AccessRequestEntity, AccessRequestStatusDb};
