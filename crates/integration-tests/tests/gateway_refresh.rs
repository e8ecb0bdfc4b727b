//! Integration tests for authenticated requests and token refresh.
//!
//! A 401 on a protected call triggers exactly one refresh and one retry.
//! A refused refresh ends the session.

use std::time::Duration;

use shopfront_core::CartLine;
use shopfront_integration_tests::{FakeBackend, USER, signed_in_user};
use shopfront_storefront::Storefront;
use shopfront_storefront::gateway::ApiError;

async fn signed_in(backend: &FakeBackend) -> Storefront {
    let storefront = Storefront::new(backend.config()).expect("client builds");
    storefront.start().await;
    storefront.sign_in(signed_in_user()).await;
    storefront
}

// =============================================================================
// Refresh Tests
// =============================================================================

#[tokio::test]
async fn test_expired_token_is_refreshed_once_and_retried() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    backend.expire_access_token();

    let lines: Vec<CartLine> = storefront
        .api()
        .authed_get(&format!("cart/{USER}"))
        .await
        .expect("retried request succeeds");

    assert!(lines.is_empty());
    assert_eq!(backend.hits("auth/refresh"), 1);
    assert!(storefront.session().is_signed_in());
}

#[tokio::test]
async fn test_concurrent_rejections_share_one_refresh() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    backend.expire_access_token();

    let (cart, wishlist) = tokio::join!(storefront.cart().refresh(), storefront.wishlist().refresh());

    cart.expect("cart loads");
    wishlist.expect("wishlist loads");
    assert_eq!(backend.hits("auth/refresh"), 1);
}

#[tokio::test]
async fn test_valid_token_never_refreshes() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;

    storefront.cart().refresh().await.expect("cart loads");

    assert_eq!(backend.hits("auth/refresh"), 0);
}

// =============================================================================
// Session Expiry Tests
// =============================================================================

#[tokio::test]
async fn test_refused_refresh_ends_session() {
    let backend = FakeBackend::start().await;
    backend.seed_cart(USER, &[("P1", 2)]);
    let storefront = signed_in(&backend).await;
    assert_eq!(storefront.cart().lines().len(), 1);

    backend.refuse_refresh(true);
    backend.expire_access_token();

    let err = storefront.cart().refresh().await.expect_err("refresh refused");

    assert!(err.is_session_expired());
    assert!(!storefront.session().is_signed_in());
    assert!(storefront.cart().lines().is_empty());
    assert_eq!(backend.hits("auth/refresh"), 1);
}

#[tokio::test]
async fn test_session_end_clears_other_user_state() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    storefront
        .wishlist()
        .add(shopfront_core::ProductRef::bare("P2"))
        .await
        .expect("wishlist add");
    assert_eq!(storefront.wishlist().len(), 1);

    backend.refuse_refresh(true);
    backend.expire_access_token();
    let _ = storefront.cart().refresh().await;

    let mut wishlist = storefront.wishlist().subscribe();
    tokio::time::timeout(Duration::from_secs(5), wishlist.wait_for(Vec::is_empty))
        .await
        .expect("wishlist cleared in time")
        .expect("store alive");
}

#[tokio::test]
async fn test_signed_out_request_fails_without_network() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::new(backend.config()).expect("client builds");

    let err = storefront
        .api()
        .authed_get::<Vec<CartLine>>(&format!("cart/{USER}"))
        .await
        .expect_err("nobody signed in");

    assert!(matches!(err, ApiError::NotAuthenticated));
    assert_eq!(backend.hits("cart"), 0);
}
