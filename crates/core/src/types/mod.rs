//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod admin;
pub mod cart;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod review;
pub mod status;
pub mod wishlist;

pub use admin::{AdminUser, Seller};
pub use cart::CartLine;
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{CancellationRequest, Order, OrderItem, ReturnRequest};
pub use price::{Price, line_total};
pub use product::{ProductRecord, ProductRef, SearchPage};
pub use review::{NewReview, Review, ReviewPage};
pub use status::*;
pub use wishlist::WishlistEntry;
