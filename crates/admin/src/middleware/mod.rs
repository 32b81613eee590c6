//! Middleware for the admin API.

pub mod auth;
pub mod request_id;

pub use auth::RequireAdminAuth;
pub use request_id::request_id_middleware;
