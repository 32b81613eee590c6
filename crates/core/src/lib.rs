//! The Strives Core - shared domain types and business rules.
//!
//! This crate is used by every component of the backend:
//! - `storefront` - Customer-facing REST API
//! - `admin` - Back-office REST API
//! - `cli` - Command-line tools for migrations, admin accounts and seeding
//!
//! # Architecture
//!
//! The core crate contains types and pure rules only: no database access and
//! no HTTP clients. The `postgres` feature adds `sqlx` encoding for the
//! newtypes so the database crate can bind them directly.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, email, phone, slug, size, money helpers and statuses
//! - [`coupon`] - Coupon eligibility and discounts
//! - [`cart`] - Cart line merging
//! - [`wishlist`] - Favourites set
//! - [`catalog`] - Product listing filters
//! - [`password`] - Password policy and hashing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod password;
pub mod types;
pub mod wishlist;

pub use types::*;
