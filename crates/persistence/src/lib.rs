//! Persistence layer for the Portfolio Gate backend.
//!
//! This crate contains:
//! - Entity definitions (database row mappings)
//! - Repository implementations and the Postgres record store,
//!   including its connection pool setup

pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod store;
