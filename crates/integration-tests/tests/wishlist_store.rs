//! Integration tests for the optimistic wishlist.

use shopfront_core::{ProductId, ProductRef, WishlistEntry, WishlistEntryId};
use shopfront_integration_tests::{FakeBackend, USER, signed_in_user};
use shopfront_storefront::Storefront;

async fn signed_in(backend: &FakeBackend) -> Storefront {
    let storefront = Storefront::new(backend.config()).expect("client builds");
    storefront.start().await;
    storefront.sign_in(signed_in_user()).await;
    storefront
}

#[tokio::test]
async fn test_add_adopts_backend_entry() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;

    storefront
        .wishlist()
        .add(ProductRef::bare("P1"))
        .await
        .expect("add P1");

    let entries = storefront.wishlist().entries();
    assert_eq!(
        entries,
        [WishlistEntry {
            id: WishlistEntryId::new("W1"),
            product: ProductRef::bare("P1"),
        }]
    );
    assert!(!entries.iter().any(|e| e.id.is_temporary()));
}

#[tokio::test]
async fn test_pending_entry_visible_while_in_flight() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;

    backend.hold_mutations();
    let task = {
        let storefront = storefront.clone();
        tokio::spawn(async move { storefront.wishlist().add(ProductRef::bare("P3")).await })
    };

    backend.wait_for_held_request().await;
    let pending = storefront.wishlist().entries();
    assert_eq!(pending.len(), 1);
    assert!(pending.iter().all(|e| e.id.is_temporary()));

    backend.release();
    task.await.expect("task joins").expect("add succeeds");
    assert!(storefront.wishlist().entries().iter().all(|e| !e.id.is_temporary()));
}

#[tokio::test]
async fn test_duplicate_add_sends_nothing() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;

    storefront.wishlist().add(ProductRef::bare("P1")).await.expect("first add");
    storefront.wishlist().add(ProductRef::bare("P1")).await.expect("second add");

    assert_eq!(storefront.wishlist().len(), 1);
    assert_eq!(backend.hits("wishlist:post"), 1);
}

#[tokio::test]
async fn test_failed_add_leaves_no_trace() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;

    backend.fail_mutations(true);
    let err = storefront
        .wishlist()
        .add(ProductRef::bare("P2"))
        .await
        .expect_err("backend down");

    assert!(err.api_error().is_some());
    assert!(storefront.wishlist().is_empty());
}

#[tokio::test]
async fn test_remove_and_failed_remove() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    let wishlist = storefront.wishlist();
    wishlist.add(ProductRef::bare("P1")).await.expect("add P1");
    wishlist.add(ProductRef::bare("P2")).await.expect("add P2");

    backend.fail_mutations(true);
    let before = wishlist.entries();
    let _ = wishlist.remove(&ProductId::new("P1")).await;
    assert_eq!(wishlist.entries(), before);

    backend.fail_mutations(false);
    wishlist.remove(&ProductId::new("P1")).await.expect("remove P1");
    assert!(!wishlist.contains(&ProductId::new("P1")));
    assert_eq!(backend.wishlist(USER).len(), 1);
}

#[tokio::test]
async fn test_server_list_after_sign_out_is_not_adopted() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;

    backend.hold_mutations();
    let task = {
        let storefront = storefront.clone();
        tokio::spawn(async move { storefront.wishlist().add(ProductRef::bare("P1")).await })
    };

    backend.wait_for_held_request().await;
    storefront.sign_out().await;
    backend.release();
    task.await.expect("task joins").expect("backend accepted the add");

    assert!(storefront.wishlist().entries().is_empty());
    assert!(!storefront.wishlist().contains(&ProductId::new("P1")));
    assert_eq!(backend.wishlist(USER).len(), 1);
}
