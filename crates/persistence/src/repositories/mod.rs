//! Repository implementations.

pub mod access_request;

pub use access_request::AccessRequestRepository;
