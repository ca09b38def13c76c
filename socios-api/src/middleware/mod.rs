/// Middleware for the API server
///
/// - `auth`: session check for everything outside setup, login and health
/// - `security`: response security headers

pub mod auth;
pub mod security;
