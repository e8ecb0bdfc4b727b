//! Product types.
//!
//! [`ProductRecord`] is the full catalog record as served by `GET /products`
//! and mirrored into the local cache. [`ProductRef`] is the slimmer shape the
//! backend embeds in cart lines and wishlist entries; depending on the
//! endpoint it is either populated or carries only the id.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A full product record from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Backend id. Records that arrive without one get a generated id before
    /// they are written to the local cache.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProductId>,
    pub name: String,
    pub price: Price,
    /// Sale price, when the product is discounted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<Price>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub specifications: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

impl ProductRecord {
    /// The price a customer pays: the discount price when set, otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        self.discount_price.unwrap_or(self.price)
    }

    /// First image, used as the thumbnail.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Build the reference embedded in cart lines and wishlist entries.
    ///
    /// Returns `None` for records that have no id yet.
    #[must_use]
    pub fn to_ref(&self) -> Option<ProductRef> {
        let id = self.id.clone()?;
        Some(ProductRef {
            id,
            name: Some(self.name.clone()),
            price: Some(self.effective_price()),
            image: self.thumbnail().map(str::to_owned),
        })
    }
}

/// A product as referenced from a cart line or wishlist entry.
///
/// Deserializes from either a populated object or a bare id string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProductRef {
    /// A reference carrying only the product id.
    #[must_use]
    pub fn bare(id: impl Into<ProductId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            price: None,
            image: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PopulatedRef {
    #[serde(rename = "_id")]
    id: ProductId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<Price>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRef {
    Id(ProductId),
    Populated(PopulatedRef),
}

impl<'de> Deserialize<'de> for ProductRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawRef::deserialize(deserializer)? {
            RawRef::Id(id) => Self::bare(id),
            RawRef::Populated(p) => Self {
                id: p.id,
                name: p.name,
                price: p.price,
                image: p.image.or_else(|| p.images.into_iter().next()),
            },
        })
    }
}

/// One page of product search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub products: Vec<ProductRecord>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub pages: u32,
}

const fn first_page() -> u32 {
    1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_product_ref_from_bare_id() {
        let r: ProductRef = serde_json::from_value(json!("P1")).unwrap();
        assert_eq!(r, ProductRef::bare("P1"));
    }

    #[test]
    fn test_product_ref_from_populated_object() {
        let r: ProductRef = serde_json::from_value(json!({
            "_id": "P1",
            "name": "Tent",
            "price": 120,
            "images": ["a.jpg", "b.jpg"],
        }))
        .unwrap();
        assert_eq!(r.id.as_str(), "P1");
        assert_eq!(r.name.as_deref(), Some("Tent"));
        assert_eq!(r.price, Some(Price::from_cents(12000)));
        assert_eq!(r.image.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn test_product_record_defaults_and_id() {
        let record: ProductRecord = serde_json::from_value(json!({
            "name": "Lamp",
            "price": "9.50",
            "discountPrice": "7.25",
        }))
        .unwrap();
        assert!(record.id.is_none());
        assert!(record.to_ref().is_none());
        assert_eq!(record.effective_price(), Price::from_cents(725));
        assert!(record.specifications.is_empty());
    }

    #[test]
    fn test_search_page_defaults() {
        let page: SearchPage = serde_json::from_value(json!({ "products": [] })).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 1);
        assert_eq!(page.total, 0);
    }
}
