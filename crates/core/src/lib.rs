//! Shopfront Core - Shared domain types.
//!
//! This crate provides the types exchanged with the storefront backend and
//! shared by every Shopfront component:
//! - `storefront` - Client library (gateway, local cache, optimistic stores)
//! - `cli` - Command-line driver for the client library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! All wire types serialize as camelCase JSON with Mongo-style `_id` keys.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, products, cart lines, wishlist entries, orders,
//!   reviews and admin records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
