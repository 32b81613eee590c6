//! Business logic services for storefront.
//!
//! - `auth` - Password authentication and bearer tokens
//! - `notifications` - Order SMS
//! - `taxonomy` - Cached taxonomy listings

pub mod auth;
pub mod notifications;
pub mod taxonomy;
