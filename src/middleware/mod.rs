//! Middleware for the MontirKu API
//!
//! Request tracing, rate limiting, security headers and bearer-token
//! authentication.

pub mod auth;
mod rate_limiter;
mod security;
mod tracing;

pub use auth::{authenticate_token, AuthenticatedUser};
pub use rate_limiter::{rate_limit, RateLimiter};
pub use security::with_security_headers;
pub use self::tracing::{request_tracing, REQUEST_ID_HEADER};
