//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (record in span, echo in response)
//! 4. CORS (permissive)
//! 5. Rate limiting on auth and OTP routes (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::AuthUser;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
