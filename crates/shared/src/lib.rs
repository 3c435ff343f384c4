//! Shared utilities for the Portfolio Gate backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Passcode generation (cryptographically random single-use codes)
//! - Cryptographic utilities (hashing, webhook signature verification)

pub mod crypto;
pub mod passcode;
