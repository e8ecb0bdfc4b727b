//! Integration test harness for Shopfront.
//!
//! [`FakeBackend`] serves the storefront REST API from an in-process `axum`
//! router on an ephemeral port. Its state is plain JSON, and it exposes
//! switches the tests flip to provoke the interesting paths:
//!
//! - [`FakeBackend::expire_access_token`]: the client's token now gets a 401
//! - [`FakeBackend::refuse_refresh`]: `POST /auth/refresh` answers 401
//! - [`FakeBackend::fail_mutations`]: cart and wishlist writes answer 500
//! - [`FakeBackend::hold_mutations`]: cart and wishlist writes wait until
//!   [`FakeBackend::release`], so a test can look at in-flight state
//!
//! Every route counts its hits (see [`FakeBackend::hits`]).
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::session::SessionUser;

/// The one customer the fake backend knows.
pub const USER: &str = "u1";
/// Refresh token accepted by `POST /auth/refresh`.
pub const REFRESH_TOKEN: &str = "refresh-1";

const INITIAL_TOKEN: &str = "access-1";
const CREATED_AT: &str = "2024-05-01T12:00:00Z";

// =============================================================================
// Fixtures
// =============================================================================

/// Catalog record JSON as the backend serves it.
#[must_use]
pub fn product(id: &str, name: &str, cents: i64, category: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "price": format!("{}.{:02}", cents / 100, cents % 100),
        "images": [format!("https://img.example.com/{id}.jpg")],
        "description": format!("{name} description"),
        "category": category,
        "brand": "Acme",
        "specifications": { "weight": "1kg" },
        "stock": 10,
    })
}

/// A small catalog spanning two categories.
#[must_use]
pub fn sample_products() -> Vec<Value> {
    vec![
        product("P1", "Wireless Headphones", 9_999, "audio"),
        product("P2", "Bluetooth Speaker", 4_950, "audio"),
        product("P3", "Headphone Stand", 1_500, "accessories"),
        product("P4", "Studio Monitor", 19_900, "audio"),
    ]
}

/// Session user for [`USER`] holding the backend's initial tokens.
#[must_use]
pub fn signed_in_user() -> SessionUser {
    SessionUser::with_id(USER, INITIAL_TOKEN, Some(REFRESH_TOKEN.to_string()))
}

// =============================================================================
// Backend State
// =============================================================================

#[derive(Default)]
struct Gate {
    held: AtomicBool,
    arrived: tokio::sync::Notify,
    release: tokio::sync::Notify,
}

struct BackendState {
    products: Mutex<Vec<Value>>,
    carts: Mutex<HashMap<String, Vec<Value>>>,
    wishlists: Mutex<HashMap<String, Vec<Value>>>,
    reviews: Mutex<HashMap<String, Vec<Value>>>,
    orders: Mutex<Vec<Value>>,
    cancellations: Mutex<Vec<Value>>,
    returns: Mutex<Vec<Value>>,
    admin: Mutex<HashMap<String, Vec<Value>>>,
    access_token: Mutex<String>,
    token_serial: AtomicUsize,
    next_id: AtomicUsize,
    refuse_refresh: AtomicBool,
    fail_mutations: AtomicBool,
    gate: Gate,
    hits: Mutex<HashMap<&'static str, usize>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BackendState {
    fn new(products: Vec<Value>) -> Self {
        let orders = vec![
            json!({
                "_id": "o1", "user": USER, "status": "pending", "total": "99.99",
                "createdAt": CREATED_AT,
                "items": [{ "product": { "_id": "P1" }, "quantity": 1, "price": "99.99" }],
            }),
            json!({
                "_id": "o2", "user": USER, "status": "delivered", "total": "49.50",
                "createdAt": CREATED_AT,
                "items": [{ "product": "P2", "quantity": 1, "price": "49.50" }],
            }),
        ];
        let admin = HashMap::from([
            (
                "users".to_string(),
                vec![json!({ "_id": USER, "name": "Una", "email": "una@example.com", "role": "customer" })],
            ),
            (
                "sellers".to_string(),
                vec![json!({
                    "_id": "s1", "name": "Sam", "email": "sam@example.com",
                    "storeName": "Sam's Sounds", "approved": false,
                })],
            ),
            ("products".to_string(), products.clone()),
        ]);
        Self {
            products: Mutex::new(products),
            carts: Mutex::default(),
            wishlists: Mutex::default(),
            reviews: Mutex::default(),
            orders: Mutex::new(orders),
            cancellations: Mutex::default(),
            returns: Mutex::default(),
            admin: Mutex::new(admin),
            access_token: Mutex::new(INITIAL_TOKEN.to_string()),
            token_serial: AtomicUsize::new(1),
            next_id: AtomicUsize::new(1),
            refuse_refresh: AtomicBool::new(false),
            fail_mutations: AtomicBool::new(false),
            gate: Gate::default(),
            hits: Mutex::default(),
        }
    }

    fn hit(&self, route: &'static str) {
        *lock(&self.hits).entry(route).or_default() += 1;
    }

    fn id(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn authorized(&self, headers: &HeaderMap) -> Result<(), Response> {
        let expected = format!("Bearer {}", lock(&self.access_token));
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if presented == Some(expected.as_str()) {
            Ok(())
        } else {
            Err(error(StatusCode::UNAUTHORIZED, "Invalid or expired token"))
        }
    }

    /// Wait at the gate (if held), then apply the failure switch.
    async fn mutation(&self) -> Result<(), Response> {
        if self.gate.held.load(Ordering::SeqCst) {
            self.gate.arrived.notify_one();
            self.gate.release.notified().await;
        }
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(error(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable"));
        }
        Ok(())
    }

    fn product_ref(&self, id: &str) -> Value {
        lock(&self.products)
            .iter()
            .find(|p| p["_id"] == id)
            .map_or_else(
                || json!({ "_id": id }),
                |p| json!({ "_id": id, "name": p["name"], "price": p["price"], "images": p["images"] }),
            )
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

type Shared = State<Arc<BackendState>>;

// =============================================================================
// FakeBackend
// =============================================================================

/// An in-process fake of the storefront backend.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
}

impl FakeBackend {
    /// Start a backend serving [`sample_products`].
    pub async fn start() -> Self {
        Self::with_products(sample_products()).await
    }

    /// Start a backend serving `products`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn with_products(products: Vec<Value>) -> Self {
        let state = Arc::new(BackendState::new(products));
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

        Self { addr, state }
    }

    /// Base URL of the API.
    ///
    /// # Panics
    ///
    /// Never in practice: the address always forms a valid URL.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).expect("valid url")
    }

    /// Client configuration pointed at this backend, with an in-memory cache,
    /// no snapshots and no stale-while-revalidate.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        let mut config = StorefrontConfig::new(self.url());
        config.request_timeout = Duration::from_secs(5);
        config.search_debounce = Duration::from_millis(20);
        config.query_stale_after = Duration::from_secs(300);
        config
    }

    /// Number of requests served by `route` (e.g. `"products"`, `"auth/refresh"`).
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        lock(&self.state.hits).get(route).copied().unwrap_or(0)
    }

    /// Rotate the access token so the one clients hold is rejected.
    pub fn expire_access_token(&self) {
        let serial = self.state.token_serial.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.state.access_token) = format!("access-{serial}");
    }

    /// Make `POST /auth/refresh` answer 401.
    pub fn refuse_refresh(&self, refuse: bool) {
        self.state.refuse_refresh.store(refuse, Ordering::SeqCst);
    }

    /// Make cart and wishlist writes answer 503.
    pub fn fail_mutations(&self, fail: bool) {
        self.state.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Make cart and wishlist writes wait for [`FakeBackend::release`].
    pub fn hold_mutations(&self) {
        self.state.gate.held.store(true, Ordering::SeqCst);
    }

    /// Wait until a held write has arrived.
    pub async fn wait_for_held_request(&self) {
        self.state.gate.arrived.notified().await;
    }

    /// Let held writes proceed and stop holding new ones.
    pub fn release(&self) {
        self.state.gate.held.store(false, Ordering::SeqCst);
        self.state.gate.release.notify_waiters();
        self.state.gate.release.notify_one();
    }

    /// Server-side cart of `user`.
    #[must_use]
    pub fn cart(&self, user: &str) -> Vec<Value> {
        lock(&self.state.carts).get(user).cloned().unwrap_or_default()
    }

    /// Seed the server-side cart of `user` with `(product id, quantity)` lines.
    pub fn seed_cart(&self, user: &str, lines: &[(&str, u32)]) {
        let lines = lines
            .iter()
            .map(|(id, quantity)| json!({ "product": self.state.product_ref(id), "quantity": quantity }))
            .collect();
        lock(&self.state.carts).insert(user.to_string(), lines);
    }

    /// Server-side wishlist of `user`.
    #[must_use]
    pub fn wishlist(&self, user: &str) -> Vec<Value> {
        lock(&self.state.wishlists).get(user).cloned().unwrap_or_default()
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Arc<BackendState>) -> Router {
    let api = Router::new()
        .route("/auth/refresh", post(refresh))
        .route("/products", get(list_products))
        .route("/products/search", get(search_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/similar", get(similar_products))
        .route("/products/{id}/reviews", get(list_reviews).post(create_review))
        .route("/cart/{user}", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/cart/{user}/{product}", put(set_quantity).delete(remove_from_cart))
        .route("/wishlist/{user}", get(get_wishlist).post(add_to_wishlist))
        .route("/wishlist/{user}/{product}", axum::routing::delete(remove_from_wishlist))
        .route("/orders/{id}", get(list_orders))
        .route("/orders/{id}/{order}", get(get_order))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/orders/{id}/return", post(return_order))
        .route("/cancellations/{user}", get(list_cancellations))
        .route("/returns/{user}", get(list_returns))
        .route("/admin/{resource}", get(admin_list).post(admin_create))
        .route(
            "/admin/{resource}/{id}",
            get(admin_get).put(admin_update).delete(admin_delete),
        )
        .route("/admin/{resource}/{id}/approve", post(admin_approve))
        .with_state(state);

    Router::new().nest("/api", api)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: String,
}

async fn refresh(State(state): Shared, Json(body): Json<RefreshBody>) -> Response {
    state.hit("auth/refresh");
    if state.refuse_refresh.load(Ordering::SeqCst) || body.refresh_token != REFRESH_TOKEN {
        return error(StatusCode::UNAUTHORIZED, "Invalid refresh token");
    }
    let serial = state.token_serial.fetch_add(1, Ordering::SeqCst) + 1;
    let token = format!("access-{serial}");
    *lock(&state.access_token) = token.clone();
    Json(json!({ "accessToken": token, "refreshToken": REFRESH_TOKEN })).into_response()
}

// -----------------------------------------------------------------------------
// Catalog
// -----------------------------------------------------------------------------

async fn list_products(State(state): Shared) -> Response {
    state.hit("products");
    Json(Value::Array(lock(&state.products).clone())).into_response()
}

async fn get_product(State(state): Shared, Path(id): Path<String>) -> Response {
    state.hit("products/{id}");
    lock(&state.products)
        .iter()
        .find(|p| p["_id"] == id.as_str())
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Product not found"),
            |p| Json(p.clone()).into_response(),
        )
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
    #[serde(default = "first_page")]
    page: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

const fn first_page() -> usize {
    1
}

const fn default_limit() -> usize {
    10
}

async fn search_products(State(state): Shared, Query(params): Query<SearchParams>) -> Response {
    state.hit("products/search");
    let needle = params.q.to_lowercase();
    let matches: Vec<Value> = lock(&state.products)
        .iter()
        .filter(|p| {
            p["name"]
                .as_str()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();
    Json(paginate("products", &matches, params.page, params.limit)).into_response()
}

fn paginate(field: &str, items: &[Value], page: usize, limit: usize) -> Value {
    let limit = limit.max(1);
    let page = page.max(1);
    let pages = items.len().div_ceil(limit).max(1);
    let slice: Vec<Value> = items.iter().skip((page - 1) * limit).take(limit).cloned().collect();
    json!({ field: slice, "total": items.len(), "page": page, "pages": pages })
}

async fn similar_products(State(state): Shared, Path(id): Path<String>) -> Response {
    state.hit("products/{id}/similar");
    let products = lock(&state.products);
    let Some(category) = products
        .iter()
        .find(|p| p["_id"] == id.as_str())
        .map(|p| p["category"].clone())
    else {
        return error(StatusCode::NOT_FOUND, "Product not found");
    };
    let similar: Vec<Value> = products
        .iter()
        .filter(|p| p["category"] == category && p["_id"] != id.as_str())
        .cloned()
        .collect();
    Json(Value::Array(similar)).into_response()
}

#[derive(Deserialize)]
struct PageParams {
    #[serde(default = "first_page")]
    page: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

async fn list_reviews(
    State(state): Shared,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Response {
    state.hit("products/{id}/reviews");
    let reviews = lock(&state.reviews).get(&id).cloned().unwrap_or_default();
    Json(paginate("reviews", &reviews, params.page, params.limit)).into_response()
}

async fn create_review(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    state.hit("products/{id}/reviews:post");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    let review = json!({
        "_id": state.id("R"),
        "product": id,
        "user": USER,
        "rating": body["rating"],
        "comment": body["comment"],
        "createdAt": CREATED_AT,
    });
    lock(&state.reviews).entry(id).or_default().push(review.clone());
    (StatusCode::CREATED, Json(review)).into_response()
}

// -----------------------------------------------------------------------------
// Cart
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBody {
    product_id: String,
    #[serde(default)]
    quantity: Option<u64>,
}

#[derive(Deserialize)]
struct QuantityBody {
    quantity: u64,
}

async fn get_cart(State(state): Shared, headers: HeaderMap, Path(user): Path<String>) -> Response {
    state.hit("cart");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    Json(lock(&state.carts).get(&user).cloned().unwrap_or_default()).into_response()
}

async fn add_to_cart(
    State(state): Shared,
    headers: HeaderMap,
    Path(user): Path<String>,
    Json(body): Json<AddBody>,
) -> Response {
    state.hit("cart:post");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    if let Err(response) = state.mutation().await {
        return response;
    }
    let quantity = body.quantity.unwrap_or(1);
    let product = state.product_ref(&body.product_id);
    let mut carts = lock(&state.carts);
    let lines = carts.entry(user).or_default();
    match lines
        .iter_mut()
        .find(|l| l["product"]["_id"] == body.product_id.as_str())
    {
        Some(line) => {
            let current = line["quantity"].as_u64().unwrap_or(0);
            line["quantity"] = json!(current + quantity);
        }
        None => lines.push(json!({ "product": product, "quantity": quantity })),
    }
    Json(lines.clone()).into_response()
}

async fn set_quantity(
    State(state): Shared,
    headers: HeaderMap,
    Path((user, product)): Path<(String, String)>,
    Json(body): Json<QuantityBody>,
) -> Response {
    state.hit("cart:put");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    if let Err(response) = state.mutation().await {
        return response;
    }
    let mut carts = lock(&state.carts);
    let lines = carts.entry(user).or_default();
    match lines.iter_mut().find(|l| l["product"]["_id"] == product.as_str()) {
        Some(line) => {
            line["quantity"] = json!(body.quantity);
            Json(lines.clone()).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "Item not in cart"),
    }
}

async fn remove_from_cart(
    State(state): Shared,
    headers: HeaderMap,
    Path((user, product)): Path<(String, String)>,
) -> Response {
    state.hit("cart:delete");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    if let Err(response) = state.mutation().await {
        return response;
    }
    let mut carts = lock(&state.carts);
    let lines = carts.entry(user).or_default();
    lines.retain(|l| l["product"]["_id"] != product.as_str());
    Json(lines.clone()).into_response()
}

async fn clear_cart(State(state): Shared, headers: HeaderMap, Path(user): Path<String>) -> Response {
    state.hit("cart:clear");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    if let Err(response) = state.mutation().await {
        return response;
    }
    lock(&state.carts).remove(&user);
    Json(json!([])).into_response()
}

// -----------------------------------------------------------------------------
// Wishlist
// -----------------------------------------------------------------------------

async fn get_wishlist(State(state): Shared, headers: HeaderMap, Path(user): Path<String>) -> Response {
    state.hit("wishlist");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    Json(lock(&state.wishlists).get(&user).cloned().unwrap_or_default()).into_response()
}

async fn add_to_wishlist(
    State(state): Shared,
    headers: HeaderMap,
    Path(user): Path<String>,
    Json(body): Json<AddBody>,
) -> Response {
    state.hit("wishlist:post");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    if let Err(response) = state.mutation().await {
        return response;
    }
    let entry = json!({ "_id": state.id("W"), "product": { "_id": body.product_id } });
    let mut wishlists = lock(&state.wishlists);
    let entries = wishlists.entry(user).or_default();
    if !entries
        .iter()
        .any(|e| e["product"]["_id"] == body.product_id.as_str())
    {
        entries.push(entry);
    }
    Json(entries.clone()).into_response()
}

async fn remove_from_wishlist(
    State(state): Shared,
    headers: HeaderMap,
    Path((user, product)): Path<(String, String)>,
) -> Response {
    state.hit("wishlist:delete");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    if let Err(response) = state.mutation().await {
        return response;
    }
    let mut wishlists = lock(&state.wishlists);
    let entries = wishlists.entry(user).or_default();
    entries.retain(|e| e["product"]["_id"] != product.as_str());
    Json(entries.clone()).into_response()
}

// -----------------------------------------------------------------------------
// Orders
// -----------------------------------------------------------------------------

async fn list_orders(State(state): Shared, headers: HeaderMap, Path(user): Path<String>) -> Response {
    state.hit("orders");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    let orders: Vec<Value> = lock(&state.orders)
        .iter()
        .filter(|o| o["user"] == user.as_str())
        .cloned()
        .collect();
    Json(orders).into_response()
}

async fn get_order(
    State(state): Shared,
    headers: HeaderMap,
    Path((user, order)): Path<(String, String)>,
) -> Response {
    state.hit("orders/{order}");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    lock(&state.orders)
        .iter()
        .find(|o| o["user"] == user.as_str() && o["_id"] == order.as_str())
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Order not found"),
            |o| Json(o.clone()).into_response(),
        )
}

#[derive(Deserialize)]
struct ReasonBody {
    reason: String,
}

fn order_request(
    state: &BackendState,
    order: &str,
    reason: String,
    allowed: &[&str],
    next_status: &str,
) -> Result<Value, Response> {
    let mut orders = lock(&state.orders);
    let Some(found) = orders.iter_mut().find(|o| o["_id"] == order) else {
        return Err(error(StatusCode::NOT_FOUND, "Order not found"));
    };
    if !allowed.iter().any(|s| found["status"] == *s) {
        return Err(error(StatusCode::BAD_REQUEST, "Order is not eligible"));
    }
    found["status"] = json!(next_status);
    Ok(json!({
        "_id": state.id("REQ"),
        "order": order,
        "reason": reason,
        "status": "pending",
        "createdAt": CREATED_AT,
    }))
}

async fn cancel_order(
    State(state): Shared,
    headers: HeaderMap,
    Path(order): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Response {
    state.hit("orders/{order}/cancel");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    match order_request(&state, &order, body.reason, &["pending", "processing"], "cancelled") {
        Ok(request) => {
            lock(&state.cancellations).push(request.clone());
            (StatusCode::CREATED, Json(request)).into_response()
        }
        Err(response) => response,
    }
}

async fn return_order(
    State(state): Shared,
    headers: HeaderMap,
    Path(order): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Response {
    state.hit("orders/{order}/return");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    match order_request(&state, &order, body.reason, &["delivered"], "returned") {
        Ok(request) => {
            lock(&state.returns).push(request.clone());
            (StatusCode::CREATED, Json(request)).into_response()
        }
        Err(response) => response,
    }
}

async fn list_cancellations(State(state): Shared, headers: HeaderMap, Path(_user): Path<String>) -> Response {
    state.hit("cancellations");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    Json(lock(&state.cancellations).clone()).into_response()
}

async fn list_returns(State(state): Shared, headers: HeaderMap, Path(_user): Path<String>) -> Response {
    state.hit("returns");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    Json(lock(&state.returns).clone()).into_response()
}

// -----------------------------------------------------------------------------
// Admin
// -----------------------------------------------------------------------------

async fn admin_list(State(state): Shared, headers: HeaderMap, Path(resource): Path<String>) -> Response {
    state.hit("admin");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    match lock(&state.admin).get(&resource) {
        Some(records) => Json(records.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Unknown resource"),
    }
}

async fn admin_get(
    State(state): Shared,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    state.hit("admin");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    lock(&state.admin)
        .get(&resource)
        .and_then(|records| records.iter().find(|r| r["_id"] == id.as_str()).cloned())
        .map_or_else(
            || error(StatusCode::NOT_FOUND, "Record not found"),
            |r| Json(r).into_response(),
        )
}

async fn admin_create(
    State(state): Shared,
    headers: HeaderMap,
    Path(resource): Path<String>,
    Json(mut record): Json<Value>,
) -> Response {
    state.hit("admin");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    record["_id"] = json!(state.id("A"));
    lock(&state.admin).entry(resource).or_default().push(record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn admin_update(
    State(state): Shared,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
    Json(mut record): Json<Value>,
) -> Response {
    state.hit("admin");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    let mut admin = lock(&state.admin);
    let Some(existing) = admin
        .get_mut(&resource)
        .and_then(|records| records.iter_mut().find(|r| r["_id"] == id.as_str()))
    else {
        return error(StatusCode::NOT_FOUND, "Record not found");
    };
    record["_id"] = json!(id);
    *existing = record.clone();
    Json(record).into_response()
}

async fn admin_delete(
    State(state): Shared,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    state.hit("admin");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    let mut admin = lock(&state.admin);
    let Some(records) = admin.get_mut(&resource) else {
        return error(StatusCode::NOT_FOUND, "Unknown resource");
    };
    let before = records.len();
    records.retain(|r| r["_id"] != id.as_str());
    if records.len() == before {
        return error(StatusCode::NOT_FOUND, "Record not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn admin_approve(
    State(state): Shared,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    state.hit("admin");
    if let Err(response) = state.authorized(&headers) {
        return response;
    }
    if resource != "sellers" {
        return error(StatusCode::NOT_FOUND, "Only sellers can be approved");
    }
    let mut admin = lock(&state.admin);
    let Some(seller) = admin
        .get_mut("sellers")
        .and_then(|records| records.iter_mut().find(|r| r["_id"] == id.as_str()))
    else {
        return error(StatusCode::NOT_FOUND, "Seller not found");
    };
    seller["approved"] = json!(true);
    Json(seller.clone()).into_response()
}
