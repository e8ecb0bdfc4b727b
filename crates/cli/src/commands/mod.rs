//! Subcommand implementations.

pub mod cart;
pub mod orders;
pub mod products;
pub mod wishlist;
