//! Shopping cart store.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use shopfront_core::{CartLine, Price, ProductId, ProductRef, UserId};

use super::StoreError;
use super::optimistic::{OptimisticList, Prior, Snapshot};
use crate::gateway::{ApiClient, ApiError, ApiRequest};
use crate::notify::Notifier;
use crate::snapshot::{SnapshotKey, SnapshotStore};

/// The signed-in user's cart, mutated optimistically.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    api: ApiClient,
    lines: OptimisticList<CartLine>,
    notifier: Notifier,
    snapshots: SnapshotStore,
}

impl CartStore {
    /// Create an empty cart store.
    #[must_use]
    pub fn new(api: ApiClient, notifier: Notifier, snapshots: SnapshotStore) -> Self {
        Self {
            inner: Arc::new(CartInner {
                api,
                lines: OptimisticList::new(Vec::new()),
                notifier,
                snapshots,
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.inner.lines.items()
    }

    /// Whether the cart holds a line for `product`.
    #[must_use]
    pub fn contains(&self, product: &ProductId) -> bool {
        self.inner.lines.contains(product)
    }

    /// Line for `product`, if present.
    #[must_use]
    pub fn line(&self, product: &ProductId) -> Option<CartLine> {
        self.inner.lines.get(product)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.inner
            .lines
            .with_items(|lines| lines.iter().map(|l| u64::from(l.quantity)).sum())
    }

    /// Sum of price x quantity over lines whose product carries a price.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.inner
            .lines
            .with_items(|lines| lines.iter().filter_map(CartLine::total).sum())
    }

    /// Receive every published version of the cart.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartLine>> {
        self.inner.lines.subscribe()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units (default 1) of `product`.
    ///
    /// A product already in the cart has its line's quantity increased.
    ///
    /// # Errors
    ///
    /// `StoreError::NotAuthenticated` without touching the cart when nobody is
    /// signed in; `StoreError::Api` after rolling back when the backend
    /// rejects the change.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: ProductRef, quantity: Option<u32>) -> Result<(), StoreError> {
        let user = self.require_user()?;
        let quantity = quantity.unwrap_or(1);
        let key = product.id.clone();
        let request = ApiRequest::post(format!("cart/{user}"))
            .json(&json!({ "productId": key, "quantity": quantity }))?;
        let _guard = self.inner.lines.lock(&key).await;

        let prior = self.inner.lines.upsert(&key, |existing| match existing {
            Some(line) => CartLine::new(line.product.clone(), line.quantity.saturating_add(quantity)),
            None => CartLine::new(product, quantity),
        });

        match self.inner.api.send_authed(request).await {
            Ok(()) => {
                self.inner.notifier.success("Added to cart");
                self.persist(&user, prior.generation()).await;
                Ok(())
            }
            Err(e) => Err(self.fail(e, prior, "Failed to add item to cart")),
        }
    }

    /// Remove the line for `product`.
    ///
    /// # Errors
    ///
    /// See [`CartStore::add`]. On failure the line is restored at its
    /// original position.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn remove(&self, product: &ProductId) -> Result<(), StoreError> {
        let user = self.require_user()?;
        let _guard = self.inner.lines.lock(product).await;

        let prior = self.inner.lines.remove(product);

        let request = ApiRequest::delete(format!("cart/{user}/{product}"));
        match self.inner.api.send_authed(request).await {
            Ok(()) => {
                self.inner.notifier.success("Removed from cart");
                self.persist(&user, prior.generation()).await;
                Ok(())
            }
            Err(e) => Err(self.fail(e, prior, "Failed to remove item from cart")),
        }
    }

    /// Set the quantity of the line for `product`.
    ///
    /// The quantity is taken as given. A product with no line is left alone
    /// and no request is sent.
    ///
    /// # Errors
    ///
    /// See [`CartStore::add`].
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn update_quantity(&self, product: &ProductId, quantity: u32) -> Result<(), StoreError> {
        let user = self.require_user()?;
        let request = ApiRequest::put(format!("cart/{user}/{product}"))
            .json(&json!({ "quantity": quantity }))?;
        let _guard = self.inner.lines.lock(product).await;

        let Some(prior) = self.inner.lines.update(product, |line| line.quantity = quantity) else {
            debug!("no cart line to update");
            return Ok(());
        };

        match self.inner.api.send_authed(request).await {
            Ok(()) => {
                self.persist(&user, prior.generation()).await;
                Ok(())
            }
            Err(e) => Err(self.fail(e, prior, "Failed to update quantity")),
        }
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// See [`CartStore::add`]. On failure every line is restored.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StoreError> {
        let user = self.require_user()?;

        let snapshot = self.inner.lines.take_all();
        let generation = snapshot.generation();

        let request = ApiRequest::delete(format!("cart/{user}"));
        match self.inner.api.send_authed(request).await {
            Ok(()) => {
                self.inner.notifier.success("Cart cleared");
                self.persist(&user, generation).await;
                Ok(())
            }
            Err(e) => Err(self.fail_all(e, snapshot, "Failed to clear cart")),
        }
    }

    /// Replace the cart with the backend's copy.
    ///
    /// # Errors
    ///
    /// `StoreError::NotAuthenticated` when nobody is signed in, or the fetch error.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let user = self.require_user()?;
        let generation = self.inner.lines.generation();

        match self.inner.api.authed_get::<Vec<CartLine>>(&format!("cart/{user}")).await {
            Ok(lines) => {
                if self.inner.lines.replace(lines, generation) {
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

    /// Drop all lines and invalidate operations in flight.
    pub fn reset(&self) {
        self.inner.lines.reset();
    }

    /// Show the last snapshot saved for `user` while the backend copy loads.
    pub async fn restore_snapshot(&self, user: &UserId) {
        let generation = self.inner.lines.generation();
        if let Some(lines) = self
            .inner
            .snapshots
            .load_collection::<CartLine>(SnapshotKey::Cart, user)
            .await
        {
            debug!(user_id = %user, count = lines.len(), "restored cart snapshot");
            self.inner.lines.replace(lines, generation);
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_user(&self) -> Result<UserId, StoreError> {
        self.inner
            .api
            .session()
            .user_id()
            .ok_or(StoreError::NotAuthenticated)
    }

    fn fail(&self, err: ApiError, prior: Prior<CartLine>, fallback: &str) -> StoreError {
        if matches!(err, ApiError::SessionExpired) {
            self.reset();
        } else {
            self.inner.lines.rollback(prior);
        }
        warn!(error = %err, "cart change rejected");
        self.inner.notifier.error(err.user_message(fallback));
        err.into()
    }

    fn fail_all(&self, err: ApiError, snapshot: Snapshot<CartLine>, fallback: &str) -> StoreError {
        if matches!(err, ApiError::SessionExpired) {
            self.reset();
        } else {
            self.inner.lines.restore(snapshot);
        }
        warn!(error = %err, "cart change rejected");
        self.inner.notifier.error(err.user_message(fallback));
        err.into()
    }

    async fn persist(&self, user: &UserId, generation: u64) {
        if !self.inner.lines.is_current(generation) {
            return;
        }
        let lines = self.lines();
        self.inner
            .snapshots
            .save_collection(SnapshotKey::Cart, user, &lines)
            .await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::session::{Session, SessionUser};

    fn store(session: Session, snapshots: SnapshotStore) -> CartStore {
        // Nothing listens here; tests below never reach the network
        let config = StorefrontConfig::new(Url::parse("http://127.0.0.1:9/").unwrap());
        let api = ApiClient::new(&config, session).unwrap();
        CartStore::new(api, Notifier::new(), snapshots)
    }

    fn priced(id: &str, cents: i64) -> ProductRef {
        ProductRef {
            price: Some(Price::from_cents(cents)),
            ..ProductRef::bare(id)
        }
    }

    #[tokio::test]
    async fn test_signed_out_mutations_fail_fast() {
        let cart = store(Session::new(), SnapshotStore::disabled());
        let mut rx = cart.subscribe();

        let err = cart.add(ProductRef::bare("A"), None).await.unwrap_err();
        assert!(matches!(err, StoreError::NotAuthenticated));
        assert!(matches!(
            cart.remove(&ProductId::new("A")).await,
            Err(StoreError::NotAuthenticated)
        ));
        assert!(matches!(cart.clear().await, Err(StoreError::NotAuthenticated)));
        assert!(matches!(cart.refresh().await, Err(StoreError::NotAuthenticated)));

        assert!(cart.lines().is_empty());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_derived_reads() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path());
        let user = UserId::new("u1");
        snapshots
            .save_collection(
                SnapshotKey::Cart,
                &user,
                &[
                    CartLine::new(priced("A", 1_250), 2),
                    CartLine::new(ProductRef::bare("B"), 3),
                ],
            )
            .await;

        let session = Session::new();
        session.sign_in(SessionUser::with_id("u1", "token", None));
        let cart = store(session, snapshots);
        cart.restore_snapshot(&user).await;

        assert_eq!(cart.item_count(), 5);
        // B has no known price
        assert_eq!(cart.subtotal(), Price::from_cents(2_500));
        assert!(cart.contains(&ProductId::new("B")));
        assert_eq!(cart.line(&ProductId::new("A")).map(|l| l.quantity), Some(2));
    }

    #[tokio::test]
    async fn test_update_of_missing_line_sends_nothing() {
        let session = Session::new();
        session.sign_in(SessionUser::with_id("u1", "token", None));
        let cart = store(session, SnapshotStore::disabled());

        cart.update_quantity(&ProductId::new("A"), 3).await.unwrap();
        assert!(cart.lines().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_of_other_user_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path());
        snapshots
            .save_collection(
                SnapshotKey::Cart,
                &UserId::new("someone-else"),
                &[CartLine::new(ProductRef::bare("A"), 1)],
            )
            .await;

        let cart = store(Session::new(), snapshots);
        cart.restore_snapshot(&UserId::new("u1")).await;
        assert!(cart.lines().is_empty());
    }
}
