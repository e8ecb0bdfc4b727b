//! Storefront state shared by every view.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, instrument, warn};

use crate::admin::AdminConsole;
use crate::cache::CacheLocation;
use crate::config::StorefrontConfig;
use crate::gateway::{ApiClient, ApiError};
use crate::notify::Notifier;
use crate::queries::Queries;
use crate::session::{Profile, Session, SessionUser};
use crate::snapshot::{SnapshotKey, SnapshotStore};
use crate::stores::{CartStore, CatalogSource, CatalogStore, WishlistStore};

/// Every store, query cache and client the storefront needs.
///
/// Constructed once and handed to callers. Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    session: Session,
    api: ApiClient,
    notifier: Notifier,
    snapshots: SnapshotStore,
    catalog: CatalogStore,
    cart: CartStore,
    wishlist: WishlistStore,
    queries: Queries,
    admin: AdminConsole,
    watching: AtomicBool,
}

impl Storefront {
    /// Wire up the storefront for `config`. Nothing is loaded until
    /// [`Storefront::start`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let session = Session::new();
        let api = ApiClient::new(&config, session.clone())?;
        let notifier = Notifier::new();
        let snapshots = SnapshotStore::from_dir(config.snapshot_dir.as_deref());

        let catalog = CatalogStore::new(
            api.clone(),
            CacheLocation::from_path(config.cache_path.as_deref()),
            config.revalidate_catalog,
        );
        let cart = CartStore::new(api.clone(), notifier.clone(), snapshots.clone());
        let wishlist = WishlistStore::new(api.clone(), notifier.clone(), snapshots.clone());
        let queries = Queries::new(api.clone(), &config);
        let admin = AdminConsole::new(api.clone());

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                session,
                api,
                notifier,
                snapshots,
                catalog,
                cart,
                wishlist,
                queries,
                admin,
                watching: AtomicBool::new(false),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn queries(&self) -> &Queries {
        &self.inner.queries
    }

    #[must_use]
    pub fn admin(&self) -> &AdminConsole {
        &self.inner.admin
    }

    /// Bootstrap the catalog and start following session changes.
    #[instrument(skip(self))]
    pub async fn start(&self) -> CatalogSource {
        if !self.inner.watching.swap(true, Ordering::SeqCst) {
            self.watch_session();
        }
        self.inner.catalog.bootstrap().await
    }

    /// Profile of whoever was signed in when the storefront last ran.
    pub async fn last_user(&self) -> Option<Profile> {
        match self.inner.snapshots.load::<Profile>(SnapshotKey::User).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable user snapshot");
                None
            }
        }
    }

    /// Sign `user` in, show their snapshotted cart and wishlist, then load
    /// the backend copies.
    #[instrument(skip_all, fields(user_id = %user.id()))]
    pub async fn sign_in(&self, user: SessionUser) {
        let profile = user.profile.clone();
        if self.inner.session.user_id().as_ref() != Some(&profile.id) {
            self.reset_user_state().await;
        }
        self.inner.session.sign_in(user);

        if let Err(e) = self.inner.snapshots.save(SnapshotKey::User, &profile).await {
            warn!(error = %e, "failed to write user snapshot");
        }
        self.inner.cart.restore_snapshot(&profile.id).await;
        self.inner.wishlist.restore_snapshot(&profile.id).await;

        let (cart, wishlist) = tokio::join!(self.inner.cart.refresh(), self.inner.wishlist.refresh());
        if let Err(e) = cart {
            warn!(error = %e, "failed to load cart");
        }
        if let Err(e) = wishlist {
            warn!(error = %e, "failed to load wishlist");
        }
        info!("signed in");
    }

    /// Sign out and forget everything tied to the user.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        if self.inner.session.sign_out().is_some() {
            info!("signed out");
        }
        self.reset_user_state().await;
        self.remove_snapshots().await;
    }

    async fn reset_user_state(&self) {
        self.inner.cart.reset();
        self.inner.wishlist.reset();
        self.inner.queries.clear_user_data().await;
    }

    async fn remove_snapshots(&self) {
        for key in [SnapshotKey::User, SnapshotKey::Cart, SnapshotKey::Wishlist] {
            if let Err(e) = self.inner.snapshots.remove(key).await {
                warn!(error = %e, ?key, "failed to remove snapshot");
            }
        }
    }

    /// Clear user state when the session ends on its own (refused refresh).
    fn watch_session(&self) {
        let mut identity = self.inner.session.subscribe();
        let storefront = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while identity.changed().await.is_ok() {
                let signed_in = identity.borrow_and_update().is_some();
                if signed_in {
                    continue;
                }
                let Some(inner) = storefront.upgrade() else {
                    break;
                };
                debug!("session ended, clearing user state");
                let storefront = Storefront { inner };
                storefront.reset_user_state().await;
                storefront.remove_snapshots().await;
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use shopfront_core::UserId;

    use super::*;

    fn storefront(dir: &std::path::Path) -> Storefront {
        let mut config = StorefrontConfig::new(Url::parse("http://127.0.0.1:9/").unwrap());
        config.snapshot_dir = Some(dir.to_path_buf());
        Storefront::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_remembers_profile_and_sign_out_forgets_it() {
        let dir = tempfile::tempdir().unwrap();
        let storefront = storefront(dir.path());
        assert!(storefront.last_user().await.is_none());

        // Refreshes fail against the discard port; sign-in still completes
        storefront
            .sign_in(SessionUser::with_id("u1", "token", None))
            .await;
        assert_eq!(storefront.session().user_id(), Some(UserId::new("u1")));
        assert_eq!(
            storefront.last_user().await.map(|p| p.id),
            Some(UserId::new("u1"))
        );

        storefront.sign_out().await;
        assert!(!storefront.session().is_signed_in());
        assert!(storefront.last_user().await.is_none());
        assert!(storefront.cart().lines().is_empty());
    }

    #[tokio::test]
    async fn test_start_with_nothing_reachable_publishes_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let storefront = storefront(dir.path());

        assert_eq!(storefront.start().await, CatalogSource::Unavailable);
        assert!(!storefront.catalog().is_loading());
        assert!(storefront.catalog().products().is_empty());
    }

    #[tokio::test]
    async fn test_restart_keeps_a_single_session_watcher() {
        let dir = tempfile::tempdir().unwrap();
        let storefront = storefront(dir.path());
        let baseline = storefront.session().subscriber_count();

        storefront.start().await;
        storefront.start().await;

        assert_eq!(storefront.session().subscriber_count(), baseline + 1);
    }
}
