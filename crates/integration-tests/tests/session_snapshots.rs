//! Integration tests for user snapshots across storefront restarts.
//!
//! The cart and wishlist are written to disk after each confirmed change so
//! the next launch can show them before the backend answers.

use shopfront_core::{ProductRef, UserId};
use shopfront_integration_tests::{FakeBackend, USER, signed_in_user};
use shopfront_storefront::Storefront;

fn storefront_with_snapshots(backend: &FakeBackend, dir: &tempfile::TempDir) -> Storefront {
    let mut config = backend.config();
    config.snapshot_dir = Some(dir.path().to_path_buf());
    Storefront::new(config).expect("client builds")
}

#[tokio::test]
async fn test_restart_restores_last_user_and_cart() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().expect("temp dir");

    let first = storefront_with_snapshots(&backend, &dir);
    first.sign_in(signed_in_user()).await;
    first
        .cart()
        .add(ProductRef::bare("P2"), Some(2))
        .await
        .expect("add P2");
    first
        .wishlist()
        .add(ProductRef::bare("P4"))
        .await
        .expect("wish P4");
    let cart = first.cart().lines();
    let wishlist = first.wishlist().entries();
    drop(first);

    let second = storefront_with_snapshots(&backend, &dir);
    let profile = second.last_user().await.expect("profile snapshot");
    assert_eq!(profile.id, UserId::new(USER));

    second.cart().restore_snapshot(&profile.id).await;
    second.wishlist().restore_snapshot(&profile.id).await;
    assert_eq!(second.cart().lines(), cart);
    assert_eq!(second.wishlist().entries(), wishlist);
}

#[tokio::test]
async fn test_snapshot_ignored_for_other_user() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().expect("temp dir");

    let first = storefront_with_snapshots(&backend, &dir);
    first.sign_in(signed_in_user()).await;
    first
        .cart()
        .add(ProductRef::bare("P1"), None)
        .await
        .expect("add P1");
    drop(first);

    let second = storefront_with_snapshots(&backend, &dir);
    second.cart().restore_snapshot(&UserId::new("someone-else")).await;

    assert!(second.cart().lines().is_empty());
}

#[tokio::test]
async fn test_sign_out_removes_snapshots() {
    let backend = FakeBackend::start().await;
    let dir = tempfile::tempdir().expect("temp dir");

    let storefront = storefront_with_snapshots(&backend, &dir);
    storefront.sign_in(signed_in_user()).await;
    storefront
        .cart()
        .add(ProductRef::bare("P1"), None)
        .await
        .expect("add P1");

    storefront.sign_out().await;

    assert!(storefront.last_user().await.is_none());
    assert!(storefront.cart().lines().is_empty());
    assert!(storefront.wishlist().is_empty());

    let next = storefront_with_snapshots(&backend, &dir);
    next.cart().restore_snapshot(&UserId::new(USER)).await;
    assert!(next.cart().lines().is_empty());
}
