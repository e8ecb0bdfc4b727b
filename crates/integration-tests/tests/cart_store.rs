//! Integration tests for the optimistic cart.
//!
//! The local cart changes before the backend answers, and any failure
//! puts it back exactly as it was.

use shopfront_core::{Price, ProductId, ProductRef};
use shopfront_integration_tests::{FakeBackend, USER, signed_in_user};
use shopfront_storefront::Storefront;

async fn signed_in(backend: &FakeBackend) -> Storefront {
    let storefront = Storefront::new(backend.config()).expect("client builds");
    storefront.start().await;
    storefront.sign_in(signed_in_user()).await;
    storefront
}

fn product(storefront: &Storefront, id: &str) -> ProductRef {
    storefront
        .catalog()
        .product(&ProductId::new(id))
        .and_then(|p| p.to_ref())
        .expect("product in catalog")
}

fn line_ids(storefront: &Storefront) -> Vec<String> {
    storefront
        .cart()
        .lines()
        .iter()
        .map(|l| l.product_id().to_string())
        .collect()
}

// =============================================================================
// Successful Mutations
// =============================================================================

#[tokio::test]
async fn test_sequence_matches_backend() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    let cart = storefront.cart();

    cart.add(product(&storefront, "P1"), None).await.expect("add P1");
    cart.add(product(&storefront, "P2"), Some(2)).await.expect("add P2");
    cart.add(product(&storefront, "P3"), None).await.expect("add P3");
    cart.remove(&ProductId::new("P2")).await.expect("remove P2");
    cart.add(product(&storefront, "P1"), Some(2)).await.expect("add P1 again");

    assert_eq!(line_ids(&storefront), ["P1", "P3"]);
    assert_eq!(cart.line(&ProductId::new("P1")).map(|l| l.quantity), Some(3));
    assert_eq!(cart.item_count(), 4);

    let server: Vec<(String, u64)> = backend
        .cart(USER)
        .iter()
        .map(|l| {
            (
                l["product"]["_id"].as_str().unwrap_or_default().to_string(),
                l["quantity"].as_u64().unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(server, [("P1".to_string(), 3), ("P3".to_string(), 1)]);
}

#[tokio::test]
async fn test_subtotal_uses_line_prices() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    let cart = storefront.cart();

    cart.add(product(&storefront, "P1"), Some(2)).await.expect("add P1");
    cart.add(product(&storefront, "P3"), None).await.expect("add P3");

    // 2 x 99.99 + 15.00
    assert_eq!(cart.subtotal(), Price::from_cents(21_498));
}

#[tokio::test]
async fn test_sign_in_loads_backend_cart() {
    let backend = FakeBackend::start().await;
    backend.seed_cart(USER, &[("P4", 1), ("P2", 3)]);

    let storefront = signed_in(&backend).await;

    assert_eq!(line_ids(&storefront), ["P4", "P2"]);
    assert_eq!(storefront.cart().item_count(), 4);
}

#[tokio::test]
async fn test_clear_empties_both_sides() {
    let backend = FakeBackend::start().await;
    backend.seed_cart(USER, &[("P1", 1), ("P2", 1)]);
    let storefront = signed_in(&backend).await;

    storefront.cart().clear().await.expect("clear");

    assert!(storefront.cart().lines().is_empty());
    assert!(backend.cart(USER).is_empty());
}

// =============================================================================
// Rollback
// =============================================================================

#[tokio::test]
async fn test_failed_remove_restores_position() {
    let backend = FakeBackend::start().await;
    backend.seed_cart(USER, &[("P1", 1), ("P2", 2), ("P3", 1)]);
    let storefront = signed_in(&backend).await;
    let before = storefront.cart().lines();

    backend.fail_mutations(true);
    let err = storefront
        .cart()
        .remove(&ProductId::new("P2"))
        .await
        .expect_err("backend down");

    assert!(!err.is_session_expired());
    assert_eq!(storefront.cart().lines(), before);
}

#[tokio::test]
async fn test_failed_add_removes_new_line() {
    let backend = FakeBackend::start().await;
    backend.seed_cart(USER, &[("P1", 1)]);
    let storefront = signed_in(&backend).await;

    backend.fail_mutations(true);
    let _ = storefront.cart().add(product(&storefront, "P2"), None).await;

    assert_eq!(line_ids(&storefront), ["P1"]);
}

#[tokio::test]
async fn test_failed_clear_restores_every_line() {
    let backend = FakeBackend::start().await;
    backend.seed_cart(USER, &[("P1", 1), ("P2", 2)]);
    let storefront = signed_in(&backend).await;
    let before = storefront.cart().lines();

    backend.fail_mutations(true);
    let _ = storefront.cart().clear().await;

    assert_eq!(storefront.cart().lines(), before);
}

#[tokio::test]
async fn test_update_quantity_shows_transient_value_then_rolls_back() {
    let backend = FakeBackend::start().await;
    backend.seed_cart(USER, &[("P1", 1)]);
    let storefront = signed_in(&backend).await;
    let mut notices = storefront.notifier().subscribe();
    let p1 = ProductId::new("P1");

    backend.fail_mutations(true);
    backend.hold_mutations();
    let task = {
        let storefront = storefront.clone();
        let p1 = p1.clone();
        tokio::spawn(async move { storefront.cart().update_quantity(&p1, 3).await })
    };

    backend.wait_for_held_request().await;
    assert_eq!(storefront.cart().line(&p1).map(|l| l.quantity), Some(3));

    backend.release();
    let result = task.await.expect("task joins");

    assert!(result.is_err());
    assert_eq!(storefront.cart().line(&p1).map(|l| l.quantity), Some(1));
    let notice = notices.recv().await.expect("notice published");
    assert!(notice.is_error());
}

#[tokio::test]
async fn test_signed_out_mutation_leaves_cart_alone() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::new(backend.config()).expect("client builds");
    storefront.start().await;

    let err = storefront
        .cart()
        .add(ProductRef::bare("P1"), None)
        .await
        .expect_err("nobody signed in");

    assert!(matches!(err, shopfront_storefront::stores::StoreError::NotAuthenticated));
    assert!(storefront.cart().lines().is_empty());
    assert_eq!(backend.hits("cart:post"), 0);
}

// =============================================================================
// Stale Results
// =============================================================================

#[tokio::test]
async fn test_rollback_after_sign_out_is_discarded() {
    let backend = FakeBackend::start().await;
    backend.seed_cart(USER, &[("P1", 1), ("P2", 2)]);
    let storefront = signed_in(&backend).await;

    backend.fail_mutations(true);
    backend.hold_mutations();
    let task = {
        let storefront = storefront.clone();
        tokio::spawn(async move { storefront.cart().remove(&ProductId::new("P2")).await })
    };

    backend.wait_for_held_request().await;
    storefront.sign_out().await;
    backend.release();
    let result = task.await.expect("task joins");

    assert!(result.is_err());
    assert!(storefront.cart().lines().is_empty());
    assert_eq!(storefront.cart().item_count(), 0);
}
