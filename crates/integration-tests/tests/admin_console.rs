//! Integration tests for the admin console resources.

use shopfront_core::{Email, Price, ProductId, Role, SellerId, UserId};
use shopfront_integration_tests::{FakeBackend, signed_in_user};
use shopfront_storefront::Storefront;
use shopfront_storefront::gateway::ApiError;

async fn signed_in(backend: &FakeBackend) -> Storefront {
    let storefront = Storefront::new(backend.config()).expect("client builds");
    storefront.sign_in(signed_in_user()).await;
    storefront
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_users() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;

    let users = storefront.admin().users().list().await.expect("users");

    assert_eq!(users.len(), 1);
    let user = users.first().expect("one user");
    assert_eq!(user.id, Some(UserId::new("u1")));
    assert_eq!(user.role, Role::Customer);
    assert_eq!(user.email, Email::parse("una@example.com").expect("valid email"));
}

#[tokio::test]
async fn test_admin_requires_sign_in() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::new(backend.config()).expect("client builds");

    let err = storefront.admin().sellers().list().await.expect_err("signed out");

    assert!(matches!(err, ApiError::NotAuthenticated));
    assert_eq!(backend.hits("admin"), 0);
}

// =============================================================================
// Mutations
// =============================================================================

#[tokio::test]
async fn test_approve_seller() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    let admin = storefront.admin();
    let id = SellerId::new("s1");

    assert!(!admin.sellers().get(&id).await.expect("seller").approved);

    let seller = admin.approve_seller(&id).await.expect("approved");

    assert!(seller.approved);
    assert!(admin.sellers().get(&id).await.expect("seller").approved);
}

#[tokio::test]
async fn test_product_lifecycle() {
    let backend = FakeBackend::start().await;
    let storefront = signed_in(&backend).await;
    let products = storefront.admin().products();

    let mut draft = storefront
        .admin()
        .products()
        .get(&ProductId::new("P1"))
        .await
        .expect("existing product");
    draft.id = None;
    draft.name = "Wireless Headphones II".to_string();

    let created = products.create(&draft).await.expect("created");
    let id = created.id.clone().expect("id assigned");
    assert_eq!(products.list().await.expect("list").len(), 5);

    let mut changed = created;
    changed.price = Price::from_cents(8_999);
    let updated = products.update(&id, &changed).await.expect("updated");
    assert_eq!(updated.price, Price::from_cents(8_999));

    products.delete(&id).await.expect("deleted");
    let err = products.get(&id).await.expect_err("gone");
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
}
