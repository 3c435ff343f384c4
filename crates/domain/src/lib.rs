//! Domain layer for the Portfolio Gate backend.
//!
//! This crate contains:
//! - Domain models (AccessRequest, Passcode)
//! - The record store contract and an in-memory implementation
//! - Business logic services (lifecycle, redemption, reply parsing)

pub mod models;
pub mod services;
