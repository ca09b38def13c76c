//! # Sócio Torcedor API Server Library
//!
//! JSON API for the club membership service: members, monthly payments,
//! system settings, one-time setup and the dashboard.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Session and security-header layers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
