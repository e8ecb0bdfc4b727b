//! Shopfront storefront client library.
//!
//! Client-side core of the Shopfront e-commerce storefront: the state a
//! front end renders and the plumbing that keeps it in sync with the backend.
//!
//! # Architecture
//!
//! - [`stores`]: optimistic cart and wishlist stores with per-key rollback,
//!   and the catalog store served from the local product cache
//! - [`cache`]: versioned `SQLite` product cache
//! - [`gateway`]: authenticated REST client with one-shot token refresh
//! - [`queries`]: debounced search and stale-while-revalidate view queries
//! - [`admin`]: typed clients for the admin resources
//! - [`state::Storefront`]: owns one instance of each and wires them together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod queries;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod stores;

pub use error::AppError;
pub use state::Storefront;
