//! Wishlist store.
//!
//! Additions show up immediately under a temporary `tmp-` id. Once the backend
//! confirms, the local list is replaced by the list it returns, so the
//! temporary id never survives a successful add.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use shopfront_core::{ProductId, ProductRef, UserId, WishlistEntry};

use super::StoreError;
use super::optimistic::{OptimisticList, Prior};
use crate::gateway::{ApiClient, ApiError, ApiRequest};
use crate::notify::Notifier;
use crate::snapshot::{SnapshotKey, SnapshotStore};

/// The signed-in user's wishlist.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    api: ApiClient,
    entries: OptimisticList<WishlistEntry>,
    notifier: Notifier,
    snapshots: SnapshotStore,
}

impl WishlistStore {
    #[must_use]
    pub fn new(api: ApiClient, notifier: Notifier, snapshots: SnapshotStore) -> Self {
        Self {
            inner: Arc::new(WishlistInner {
                api,
                entries: OptimisticList::new(Vec::new()),
                notifier,
                snapshots,
            }),
        }
    }

    /// Current entries.
    #[must_use]
    pub fn entries(&self) -> Vec<WishlistEntry> {
        self.inner.entries.items()
    }

    /// Whether `product` is on the wishlist.
    #[must_use]
    pub fn contains(&self, product: &ProductId) -> bool {
        self.inner.entries.contains(product)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.with_items(<[WishlistEntry]>::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every published version of the wishlist.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<WishlistEntry>> {
        self.inner.entries.subscribe()
    }

    /// Add `product`. A product already on the list is left as is.
    ///
    /// # Errors
    ///
    /// `StoreError::NotAuthenticated` without touching the list when nobody is
    /// signed in; `StoreError::Api` after rolling back when the backend
    /// rejects the change.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: ProductRef) -> Result<(), StoreError> {
        let user = self.require_user()?;
        let key = product.id.clone();
        let request = ApiRequest::post(format!("wishlist/{user}")).json(&json!({ "productId": key }))?;
        let _guard = self.inner.entries.lock(&key).await;

        if self.inner.entries.contains(&key) {
            debug!("already on wishlist");
            return Ok(());
        }
        let prior = self
            .inner
            .entries
            .upsert(&key, |_| WishlistEntry::pending(product));

        match self
            .inner
            .api
            .fetch_authed::<Vec<WishlistEntry>>(request)
            .await
        {
            Ok(entries) => {
                if self.inner.entries.replace(entries, prior.generation()) {
                    self.inner.notifier.success("Added to wishlist");
                    self.persist(&user, prior.generation()).await;
                }
                Ok(())
            }
            Err(e) => Err(self.fail(e, prior, "Failed to add item to wishlist")),
        }
    }

    /// Remove `product` from the wishlist.
    ///
    /// # Errors
    ///
    /// See [`WishlistStore::add`]. On failure the entry is restored at its
    /// original position.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn remove(&self, product: &ProductId) -> Result<(), StoreError> {
        let user = self.require_user()?;
        let _guard = self.inner.entries.lock(product).await;

        let prior = self.inner.entries.remove(product);

        let request = ApiRequest::delete(format!("wishlist/{user}/{product}"));
        match self.inner.api.send_authed(request).await {
            Ok(()) => {
                self.inner.notifier.success("Removed from wishlist");
                self.persist(&user, prior.generation()).await;
                Ok(())
            }
            Err(e) => Err(self.fail(e, prior, "Failed to remove item from wishlist")),
        }
    }

    /// Replace the wishlist with the backend's copy.
    ///
    /// # Errors
    ///
    /// `StoreError::NotAuthenticated` when nobody is signed in, or the fetch error.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let user = self.require_user()?;
        let generation = self.inner.entries.generation();

        match self
            .inner
            .api
            .authed_get::<Vec<WishlistEntry>>(&format!("wishlist/{user}"))
            .await
        {
            Ok(entries) => {
                if self.inner.entries.replace(entries, generation) {
                    self.persist(&user, generation).await;
                }
                Ok(())
            }
            Err(ApiError::SessionExpired) => {
                self.reset();
                Err(StoreError::Api(ApiError::SessionExpired))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop all entries and invalidate operations in flight.
    pub fn reset(&self) {
        self.inner.entries.reset();
    }

    /// Show the last snapshot saved for `user` while the backend copy loads.
    pub async fn restore_snapshot(&self, user: &UserId) {
        let generation = self.inner.entries.generation();
        if let Some(entries) = self
            .inner
            .snapshots
            .load_collection::<WishlistEntry>(SnapshotKey::Wishlist, user)
            .await
        {
            self.inner.entries.replace(entries, generation);
        }
    }

    fn require_user(&self) -> Result<UserId, StoreError> {
        self.inner
            .api
            .session()
            .user_id()
            .ok_or(StoreError::NotAuthenticated)
    }

    fn fail(&self, err: ApiError, prior: Prior<WishlistEntry>, fallback: &str) -> StoreError {
        if matches!(err, ApiError::SessionExpired) {
            self.reset();
        } else {
            self.inner.entries.rollback(prior);
        }
        warn!(error = %err, "wishlist change rejected");
        self.inner.notifier.error(err.user_message(fallback));
        err.into()
    }

    async fn persist(&self, user: &UserId, generation: u64) {
        if !self.inner.entries.is_current(generation) {
            return;
        }
        let entries = self.entries();
        self.inner
            .snapshots
            .save_collection(SnapshotKey::Wishlist, user, &entries)
            .await;
    }
}
