//! Wishlist entry type.

use serde::{Deserialize, Serialize};

use super::id::{ProductId, WishlistEntryId};
use super::product::ProductRef;

/// An entry on a user's wishlist.
///
/// Entries created optimistically carry a temporary id (see
/// [`WishlistEntryId::temporary`]) until the server-confirmed list replaces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    #[serde(rename = "_id")]
    pub id: WishlistEntryId,
    pub product: ProductRef,
}

impl WishlistEntry {
    /// Create an unconfirmed entry for `product`.
    #[must_use]
    pub fn pending(product: ProductRef) -> Self {
        Self {
            id: WishlistEntryId::temporary(),
            product,
        }
    }

    /// Id of the wished-for product.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }
}
