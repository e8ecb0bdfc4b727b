//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ProductId, ReviewId, UserId};

/// A customer review of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    pub product: ProductId,
    pub user: UserId,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// One page of a product's reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

impl ReviewPage {
    /// Mean rating over the reviews on this page.
    #[must_use]
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
        #[allow(clippy::cast_precision_loss)]
        Some(f64::from(sum) / self.reviews.len() as f64)
    }
}

/// Payload for submitting a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
}

impl NewReview {
    /// Lowest accepted rating.
    pub const MIN_RATING: u8 = 1;
    /// Highest accepted rating.
    pub const MAX_RATING: u8 = 5;

    /// Create a review payload, rejecting ratings outside 1..=5.
    ///
    /// # Errors
    ///
    /// Returns the rejected rating when it is out of range.
    pub fn new(rating: u8, comment: impl Into<String>) -> Result<Self, u8> {
        if (Self::MIN_RATING..=Self::MAX_RATING).contains(&rating) {
            Ok(Self {
                rating,
                comment: comment.into(),
            })
        } else {
            Err(rating)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_review_rating_bounds() {
        assert!(NewReview::new(0, "").is_err());
        assert!(NewReview::new(1, "ok").is_ok());
        assert!(NewReview::new(5, "great").is_ok());
        assert_eq!(NewReview::new(6, ""), Err(6));
    }

    #[test]
    fn test_average_rating() {
        let empty = ReviewPage {
            reviews: vec![],
            total: 0,
            page: 1,
            pages: 1,
        };
        assert_eq!(empty.average_rating(), None);
    }
}
