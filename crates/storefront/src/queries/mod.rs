//! Derived view queries.
//!
//! Each query derives its cache key from its inputs and answers `Ok(None)`
//! without a request when a required input is missing: an empty product id,
//! blank search text, or nobody signed in for the order history queries.
//! Results go through a stale-while-revalidate cache (see [`SwrCache`]).

mod debounce;
mod swr;

pub use debounce::Debouncer;
pub use swr::SwrCache;

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::instrument;

use shopfront_core::{
    CancellationRequest, NewReview, Order, OrderId, ProductId, ProductRecord, ReturnRequest, Review,
    ReviewPage, SearchPage, UserId,
};

use crate::config::StorefrontConfig;
use crate::gateway::{ApiClient, ApiError, ApiRequest};

/// Default page size for search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
/// Default page size for reviews.
pub const DEFAULT_REVIEW_LIMIT: u32 = 10;

/// A failed query. Callers that shared one fetch share one error.
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct QueryError(Arc<ApiError>);

impl QueryError {
    /// The underlying gateway error.
    #[must_use]
    pub fn api_error(&self) -> &ApiError {
        &self.0
    }
}

impl From<ApiError> for QueryError {
    fn from(err: ApiError) -> Self {
        Self(Arc::new(err))
    }
}

impl From<Arc<ApiError>> for QueryError {
    fn from(err: Arc<ApiError>) -> Self {
        Self(err)
    }
}

/// Read-side queries over the backend.
#[derive(Clone)]
pub struct Queries {
    inner: Arc<QueriesInner>,
}

struct QueriesInner {
    api: ApiClient,
    search_input: Debouncer<String>,
    search: SwrCache<SearchPage>,
    similar: SwrCache<Vec<ProductRecord>>,
    reviews: SwrCache<ReviewPage>,
    orders: SwrCache<Vec<Order>>,
    order: SwrCache<Order>,
    cancellations: SwrCache<Vec<CancellationRequest>>,
    returns: SwrCache<Vec<ReturnRequest>>,
}

impl Queries {
    #[must_use]
    pub fn new(api: ApiClient, config: &StorefrontConfig) -> Self {
        let ttl = config.query_ttl;
        let stale = config.query_stale_after;
        Self {
            inner: Arc::new(QueriesInner {
                api,
                search_input: Debouncer::new(String::new(), config.search_debounce),
                search: SwrCache::new(ttl, stale),
                similar: SwrCache::new(ttl, stale),
                reviews: SwrCache::new(ttl, stale),
                orders: SwrCache::new(ttl, stale),
                order: SwrCache::new(ttl, stale),
                cancellations: SwrCache::new(ttl, stale),
                returns: SwrCache::new(ttl, stale),
            }),
        }
    }

    fn current_user(&self) -> Option<UserId> {
        self.inner.api.session().user_id()
    }

    // =========================================================================
    // Catalog Queries
    // =========================================================================

    /// Search text input, debounced before it reaches [`Queries::search_settled`].
    #[must_use]
    pub fn search_input(&self) -> &Debouncer<String> {
        &self.inner.search_input
    }

    /// Wait for the search input to settle, then search for it.
    ///
    /// # Errors
    ///
    /// See [`Queries::search`].
    pub async fn search_settled(&self, page: u32, limit: u32) -> Result<Option<SearchPage>, QueryError> {
        let text = self.inner.search_input.settled().await;
        self.search(&text, page, limit).await
    }

    /// Search the catalog. Blank text answers `None` without a request.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the search fails and nothing is cached.
    #[instrument(skip(self))]
    pub async fn search(&self, text: &str, page: u32, limit: u32) -> Result<Option<SearchPage>, QueryError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let page = page.max(1);
        let key = format!("search:{text}:{page}:{limit}");
        let request = ApiRequest::get("products/search")
            .query("q", text)
            .query("page", page)
            .query("limit", limit);
        let api = self.inner.api.clone();
        let result = self
            .inner
            .search
            .get_or_fetch(key, move || async move { api.fetch(request).await })
            .await?;
        Ok(Some(result))
    }

    /// Products similar to `product`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the lookup fails and nothing is cached.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn similar(&self, product: &ProductId) -> Result<Option<Vec<ProductRecord>>, QueryError> {
        if product.is_empty() {
            return Ok(None);
        }
        let path = format!("products/{product}/similar");
        let api = self.inner.api.clone();
        let result = self
            .inner
            .similar
            .get_or_fetch(format!("similar:{product}"), move || async move {
                api.get(&path).await
            })
            .await?;
        Ok(Some(result))
    }

    /// One page of reviews for `product`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the lookup fails and nothing is cached.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn reviews(&self, product: &ProductId, page: u32) -> Result<Option<ReviewPage>, QueryError> {
        if product.is_empty() {
            return Ok(None);
        }
        let page = page.max(1);
        let request = ApiRequest::get(format!("products/{product}/reviews"))
            .query("page", page)
            .query("limit", DEFAULT_REVIEW_LIMIT);
        let api = self.inner.api.clone();
        let result = self
            .inner
            .reviews
            .get_or_fetch(format!("reviews:{product}:{page}"), move || async move {
                api.fetch(request).await
            })
            .await?;
        Ok(Some(result))
    }

    /// Post a review for `product` and drop its cached review pages.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotAuthenticated` when nobody is signed in, or the
    /// backend's rejection.
    #[instrument(skip(self, review), fields(product_id = %product, rating = review.rating))]
    pub async fn submit_review(&self, product: &ProductId, review: &NewReview) -> Result<Review, QueryError> {
        let request = ApiRequest::post(format!("products/{product}/reviews")).json(review)?;
        let created = self.inner.api.fetch_authed(request).await?;
        self.inner.reviews.invalidate_prefix(&format!("reviews:{product}:"));
        Ok(created)
    }

    // =========================================================================
    // Order History
    // =========================================================================

    /// The signed-in user's orders.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the lookup fails and nothing is cached.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> Result<Option<Vec<Order>>, QueryError> {
        let Some(user) = self.current_user() else {
            return Ok(None);
        };
        let path = format!("orders/{user}");
        let api = self.inner.api.clone();
        let result = self
            .inner
            .orders
            .get_or_fetch(format!("orders:{user}"), move || async move {
                api.authed_get(&path).await
            })
            .await?;
        Ok(Some(result))
    }

    /// One of the signed-in user's orders.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the lookup fails and nothing is cached.
    #[instrument(skip(self), fields(order_id = %order))]
    pub async fn order(&self, order: &OrderId) -> Result<Option<Order>, QueryError> {
        let Some(user) = self.current_user() else {
            return Ok(None);
        };
        if order.is_empty() {
            return Ok(None);
        }
        let path = format!("orders/{user}/{order}");
        let api = self.inner.api.clone();
        let result = self
            .inner
            .order
            .get_or_fetch(format!("order:{user}:{order}"), move || async move {
                api.authed_get(&path).await
            })
            .await?;
        Ok(Some(result))
    }

    /// The signed-in user's cancellation requests.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the lookup fails and nothing is cached.
    pub async fn cancellations(&self) -> Result<Option<Vec<CancellationRequest>>, QueryError> {
        let Some(user) = self.current_user() else {
            return Ok(None);
        };
        let path = format!("cancellations/{user}");
        let api = self.inner.api.clone();
        let result = self
            .inner
            .cancellations
            .get_or_fetch(format!("cancellations:{user}"), move || async move {
                api.authed_get(&path).await
            })
            .await?;
        Ok(Some(result))
    }

    /// The signed-in user's return requests.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the lookup fails and nothing is cached.
    pub async fn returns(&self) -> Result<Option<Vec<ReturnRequest>>, QueryError> {
        let Some(user) = self.current_user() else {
            return Ok(None);
        };
        let path = format!("returns/{user}");
        let api = self.inner.api.clone();
        let result = self
            .inner
            .returns
            .get_or_fetch(format!("returns:{user}"), move || async move {
                api.authed_get(&path).await
            })
            .await?;
        Ok(Some(result))
    }

    /// Ask for `order` to be cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotAuthenticated` when nobody is signed in, or the
    /// backend's rejection.
    #[instrument(skip(self, reason), fields(order_id = %order))]
    pub async fn request_cancellation(&self, order: &OrderId, reason: &str) -> Result<CancellationRequest, QueryError> {
        let request = ApiRequest::post(format!("orders/{order}/cancel")).json(&json!({ "reason": reason }))?;
        let created = self.inner.api.fetch_authed(request).await?;
        self.invalidate_order_history().await;
        Ok(created)
    }

    /// Ask for `order` to be returned.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotAuthenticated` when nobody is signed in, or the
    /// backend's rejection.
    #[instrument(skip(self, reason), fields(order_id = %order))]
    pub async fn request_return(&self, order: &OrderId, reason: &str) -> Result<ReturnRequest, QueryError> {
        let request = ApiRequest::post(format!("orders/{order}/return")).json(&json!({ "reason": reason }))?;
        let created = self.inner.api.fetch_authed(request).await?;
        self.invalidate_order_history().await;
        Ok(created)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    async fn invalidate_order_history(&self) {
        let Some(user) = self.current_user() else {
            return;
        };
        self.inner.orders.invalidate(&format!("orders:{user}")).await;
        self.inner.order.invalidate_prefix(&format!("order:{user}:"));
        self.inner.cancellations.invalidate(&format!("cancellations:{user}")).await;
        self.inner.returns.invalidate(&format!("returns:{user}")).await;
    }

    /// Drop every cached result tied to a user.
    pub async fn clear_user_data(&self) {
        self.inner.orders.invalidate_all().await;
        self.inner.order.invalidate_all().await;
        self.inner.cancellations.invalidate_all().await;
        self.inner.returns.invalidate_all().await;
    }

    /// Drop every cached result.
    pub async fn invalidate_all(&self) {
        self.clear_user_data().await;
        self.inner.search.invalidate_all().await;
        self.inner.similar.invalidate_all().await;
        self.inner.reviews.invalidate_all().await;
    }
}
