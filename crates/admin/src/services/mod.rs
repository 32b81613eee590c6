//! Business services for the admin API.

pub mod auth;
pub mod notifications;
pub mod uploads;
