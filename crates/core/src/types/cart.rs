//! Cart line type.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::{Price, line_total};
use super::product::ProductRef;

/// One line of a user's cart.
///
/// A cart holds at most one line per distinct product id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: ProductRef,
    pub quantity: u32,
}

impl CartLine {
    /// Create a line for `quantity` units of `product`.
    #[must_use]
    pub const fn new(product: ProductRef, quantity: u32) -> Self {
        Self { product, quantity }
    }

    /// Id of the product on this line.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Line total, when the embedded product carries a price.
    #[must_use]
    pub fn total(&self) -> Option<Price> {
        self.product.price.map(|unit| line_total(unit, self.quantity))
    }
}
