//! Product catalog store.
//!
//! # Bootstrap
//!
//! 1. Open the local product cache (recreated when unusable)
//! 2. Cached records present: publish them, no network call
//! 3. Cache empty: fetch the full catalog, publish it, write it to the cache
//! 4. Any failure along the way: publish an empty catalog
//!
//! Loading is complete after bootstrap whichever path was taken. Once
//! populated the cache is trusted; [`CatalogStore::revalidate`] refreshes it
//! on demand, and can run in the background right after a cached bootstrap.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OnceCell, watch};
use tracing::{debug, info, instrument, warn};

use shopfront_core::{ProductId, ProductRecord};

use crate::cache::{CacheError, CacheLocation, ProductCache};
use crate::gateway::{ApiClient, ApiError};

/// Errors from explicit catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Where a bootstrap found the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Cache,
    Network,
    /// Neither source answered; an empty catalog was published.
    Unavailable,
}

/// Published catalog state.
#[derive(Debug, Clone)]
pub struct CatalogState {
    pub products: Arc<[ProductRecord]>,
    pub loading: bool,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            products: Arc::from(Vec::new()),
            loading: true,
        }
    }
}

/// The product catalog, served from the local cache when possible.
#[derive(Clone)]
pub struct CatalogStore {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    api: ApiClient,
    location: CacheLocation,
    cache: OnceCell<Option<ProductCache>>,
    revalidate_in_background: bool,
    state: watch::Sender<CatalogState>,
}

impl CatalogStore {
    /// Catalog backed by a cache at `location`, opened on first bootstrap.
    #[must_use]
    pub fn new(api: ApiClient, location: CacheLocation, revalidate_in_background: bool) -> Self {
        Self::build(api, location, OnceCell::new(), revalidate_in_background)
    }

    /// Catalog backed by an already opened cache.
    #[must_use]
    pub fn with_cache(api: ApiClient, cache: ProductCache, revalidate_in_background: bool) -> Self {
        let location = cache.location().clone();
        Self::build(
            api,
            location,
            OnceCell::new_with(Some(Some(cache))),
            revalidate_in_background,
        )
    }

    fn build(
        api: ApiClient,
        location: CacheLocation,
        cache: OnceCell<Option<ProductCache>>,
        revalidate_in_background: bool,
    ) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                api,
                location,
                cache,
                revalidate_in_background,
                state: watch::Sender::new(CatalogState::default()),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All published products.
    #[must_use]
    pub fn products(&self) -> Arc<[ProductRecord]> {
        Arc::clone(&self.inner.state.borrow().products)
    }

    /// Published product with `id`.
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<ProductRecord> {
        self.inner
            .state
            .borrow()
            .products
            .iter()
            .find(|p| p.id.as_ref() == Some(id))
            .cloned()
    }

    /// Products in `category` (case-insensitive).
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<ProductRecord> {
        self.inner
            .state
            .borrow()
            .products
            .iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect()
    }

    /// Distinct non-empty categories, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.distinct(|p| &p.category)
    }

    /// Distinct non-empty brands, sorted.
    #[must_use]
    pub fn brands(&self) -> Vec<String> {
        self.distinct(|p| &p.brand)
    }

    fn distinct(&self, field: impl Fn(&ProductRecord) -> &String) -> Vec<String> {
        let state = self.inner.state.borrow();
        state
            .products
            .iter()
            .map(field)
            .filter(|v| !v.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether bootstrap is still running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Receive every published catalog state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.inner.state.subscribe()
    }

    /// Product with `id`, from the published catalog or else the backend.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Api` if the product is not published locally and
    /// the backend lookup fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn fetch_product(&self, id: &ProductId) -> Result<ProductRecord, CatalogError> {
        if let Some(product) = self.product(id) {
            return Ok(product);
        }
        Ok(self.inner.api.get(&format!("products/{id}")).await?)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load the catalog, from the cache when it holds anything.
    ///
    /// Never fails: when nothing can be loaded an empty catalog is published.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> CatalogSource {
        let cache = self.cache().await;

        if let Some(cache) = cache {
            match cache.read_all().await {
                Ok(records) if !records.is_empty() => {
                    info!(count = records.len(), "catalog served from cache");
                    self.publish(records);
                    if self.inner.revalidate_in_background {
                        self.spawn_revalidate();
                    }
                    return CatalogSource::Cache;
                }
                Ok(_) => debug!("product cache empty"),
                Err(e) => warn!(error = %e, "failed to read product cache"),
            }
        }

        match self.fetch_all().await {
            Ok(records) => {
                info!(count = records.len(), "catalog fetched from backend");
                self.publish(records.clone());
                if let Some(cache) = cache
                    && let Err(e) = cache.replace_all(&records).await
                {
                    warn!(error = %e, "failed to write product cache");
                }
                CatalogSource::Network
            }
            Err(e) => {
                warn!(error = %e, "catalog unavailable");
                self.publish(Vec::new());
                CatalogSource::Unavailable
            }
        }
    }

    /// Re-fetch the catalog, publish it and rewrite the cache.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Api` if the fetch fails (the published catalog is
    /// kept) and `CatalogError::Cache` if the cache write fails (the new
    /// catalog is already published).
    #[instrument(skip(self))]
    pub async fn revalidate(&self) -> Result<usize, CatalogError> {
        let records = self.fetch_all().await?;
        let count = records.len();
        self.publish(records.clone());
        if let Some(cache) = self.cache().await {
            cache.replace_all(&records).await?;
        }
        info!(count, "catalog revalidated");
        Ok(count)
    }

    fn spawn_revalidate(&self) {
        let store = self.clone();
        tokio::spawn(async move {
            if let Err(e) = store.revalidate().await {
                warn!(error = %e, "background catalog revalidation failed");
            }
        });
    }

    /// Fetch the full catalog and give every record an id.
    async fn fetch_all(&self) -> Result<Vec<ProductRecord>, ApiError> {
        let mut records: Vec<ProductRecord> = self.inner.api.get("products").await?;
        for record in &mut records {
            if record.id.is_none() {
                record.id = Some(ProductId::generate());
            }
        }
        Ok(records)
    }

    async fn cache(&self) -> Option<&ProductCache> {
        self.inner
            .cache
            .get_or_init(|| async {
                match ProductCache::open(self.inner.location.clone()).await {
                    Ok(cache) => Some(cache),
                    Err(e) => {
                        warn!(error = %e, "product cache unavailable, using network only");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    fn publish(&self, records: Vec<ProductRecord>) {
        self.inner.state.send_replace(CatalogState {
            products: Arc::from(records),
            loading: false,
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::Price;
    use url::Url;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::session::Session;

    fn record(id: &str, category: &str, brand: &str) -> ProductRecord {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "name": format!("Product {id}"),
            "price": "10.00",
            "category": category,
            "brand": brand,
        }))
        .unwrap()
    }

    fn offline_api() -> ApiClient {
        // Nothing listens on the discard port
        let config = StorefrontConfig::new(Url::parse("http://127.0.0.1:9/").unwrap());
        ApiClient::new(&config, Session::new()).unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_serves_cache_without_network() {
        let cache = ProductCache::open(CacheLocation::Memory).await.unwrap();
        cache
            .replace_all(&[
                record("a", "Audio", "Acme"),
                record("b", "audio", "Bolt"),
                record("c", "Video", "Acme"),
            ])
            .await
            .unwrap();

        let catalog = CatalogStore::with_cache(offline_api(), cache, false);
        assert!(catalog.is_loading());

        assert_eq!(catalog.bootstrap().await, CatalogSource::Cache);
        assert!(!catalog.is_loading());
        assert_eq!(catalog.products().len(), 3);

        assert_eq!(catalog.by_category("AUDIO").len(), 2);
        assert_eq!(catalog.categories(), vec!["Audio", "Video", "audio"]);
        assert_eq!(catalog.brands(), vec!["Acme", "Bolt"]);
        assert_eq!(
            catalog.product(&ProductId::new("c")).map(|p| p.price),
            Some(Price::from_cents(1_000))
        );
    }

    #[tokio::test]
    async fn test_bootstrap_publishes_empty_when_everything_fails() {
        let catalog = CatalogStore::new(offline_api(), CacheLocation::Memory, false);
        let mut rx = catalog.subscribe();

        assert_eq!(catalog.bootstrap().await, CatalogSource::Unavailable);

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert!(!state.loading);
        assert!(state.products.is_empty());
    }

    #[tokio::test]
    async fn test_revalidate_failure_keeps_published_catalog() {
        let cache = ProductCache::open(CacheLocation::Memory).await.unwrap();
        cache.replace_all(&[record("a", "Audio", "Acme")]).await.unwrap();
        let catalog = CatalogStore::with_cache(offline_api(), cache, false);
        catalog.bootstrap().await;

        assert!(matches!(catalog.revalidate().await, Err(CatalogError::Api(_))));
        assert_eq!(catalog.products().len(), 1);
        assert!(catalog.fetch_product(&ProductId::new("a")).await.is_ok());
    }
}
