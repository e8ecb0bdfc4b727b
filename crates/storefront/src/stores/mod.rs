//! Observable client-side state containers.
//!
//! - [`CartStore`] and [`WishlistStore`] apply mutations optimistically and
//!   reconcile with the backend, rolling back on failure
//! - [`CatalogStore`] serves the product catalog from the local cache,
//!   falling back to the network
//!
//! All stores publish their state through `tokio::sync::watch` channels, so
//! readers always observe a whole, consistent value.

mod cart;
mod catalog;
pub mod optimistic;
mod wishlist;

pub use cart::CartStore;
pub use catalog::{CatalogError, CatalogSource, CatalogState, CatalogStore};
pub use wishlist::WishlistStore;

use thiserror::Error;

use crate::gateway::ApiError;

/// Errors returned by cart and wishlist mutations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nobody is signed in; the state was left untouched.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The backend rejected the change (already rolled back).
    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for StoreError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotAuthenticated => Self::NotAuthenticated,
            other => Self::Api(other),
        }
    }
}

impl StoreError {
    /// Whether the session ended while the change was in flight.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::Api(ApiError::SessionExpired))
    }

    /// The underlying backend error, if any.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::NotAuthenticated => None,
        }
    }
}
