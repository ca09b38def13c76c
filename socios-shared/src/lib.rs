//! # Sócio Torcedor Shared Library
//!
//! This crate contains the data layer and business rules used by the
//! membership API server.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migration runner
//! - `models`: Database models (users, members, payments, settings, audit log)
//! - `auth`: Password hashing, JWT sessions and role checks
//! - `cpf`: Brazilian national ID (CPF) normalization and validation
//! - `dashboard`: Formatting helpers for the administrative dashboard
//! - `features`: Optional feature modules shown in the settings panel

pub mod auth;
pub mod cpf;
pub mod dashboard;
pub mod db;
pub mod features;
pub mod models;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
