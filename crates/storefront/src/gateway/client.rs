//! Backend API client implementation.
//!
//! Uses `reqwest` for HTTP with JSON bodies. Protected requests are retried
//! once after a transparent token refresh.

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::ApiError;
use crate::config::StorefrontConfig;
use crate::session::Session;

/// Path of the token refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "auth/refresh";

const USER_AGENT: &str = concat!("shopfront/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// =============================================================================
// ApiRequest
// =============================================================================

/// A request description that can be sent more than once.
///
/// The body is serialized up front so a retry after token refresh sends the
/// identical payload.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Request with an explicit method.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT` request.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if the body cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the API base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront backend API.
///
/// Cheap to clone; all clones share one connection pool, one session and one
/// refresh lock.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    session: Session,
    /// Serializes token refreshes so concurrent 401s refresh once.
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    /// Create a new API client bound to `session`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig, session: Session) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        // Url::join drops the last path segment unless the base ends in '/'
        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                session,
                refresh_lock: Mutex::new(()),
            }),
        })
    }

    /// The session this client authenticates with.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    // =========================================================================
    // Typed Helpers
    // =========================================================================

    /// Public `GET` decoding a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is not 2xx, or the
    /// body does not decode as `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch(ApiRequest::get(path)).await
    }

    /// Protected `GET` decoding a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute_authed`].
    pub async fn authed_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch_authed(ApiRequest::get(path)).await
    }

    /// Send a public request and decode its JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is not 2xx, or the
    /// body does not decode as `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        decode(response).await
    }

    /// Send a protected request and decode its JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute_authed`].
    pub async fn fetch_authed<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let response = self.execute_authed(request).await?;
        decode(response).await
    }

    /// Send a protected request whose response body is not needed.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute_authed`].
    pub async fn send_authed(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute_authed(request).await.map(drop)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Send a request without credentials.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` on transport failure and `ApiError::Status`
    /// for any non-2xx response.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let response = self.dispatch(&request, None).await?;
        ensure_success(response).await
    }

    /// Send a request with the session's bearer token.
    ///
    /// On a 401 the access token is refreshed once and the request retried
    /// once with the new token; the retry's outcome is returned as-is.
    ///
    /// # Errors
    ///
    /// - `ApiError::NotAuthenticated` if nobody is signed in (no request is sent)
    /// - `ApiError::SessionExpired` if the refresh is refused; the session is cleared
    /// - `ApiError::Status` / `ApiError::Http` for other failures
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute_authed(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let token = self
            .inner
            .session
            .access_token()
            .ok_or(ApiError::NotAuthenticated)?;

        let response = self.dispatch(&request, Some(&token)).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(response).await;
        }

        debug!("access token rejected, refreshing");
        let token = self.refresh_access_token(&token).await?;
        let response = self.dispatch(&request, Some(&token)).await?;
        ensure_success(response).await
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&SecretString>,
    ) -> Result<Response, ApiError> {
        let mut builder = self
            .inner
            .client
            .request(request.method.clone(), self.url(&request.path)?);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        Ok(builder.send().await?)
    }

    // =========================================================================
    // Token Refresh
    // =========================================================================

    /// Obtain a fresh access token after `rejected` was refused.
    async fn refresh_access_token(&self, rejected: &SecretString) -> Result<SecretString, ApiError> {
        let _guard = self.inner.refresh_lock.lock().await;
        let session = &self.inner.session;

        // Another request may have refreshed while this one waited for the lock
        if !session.is_current_token(rejected) {
            return session.access_token().ok_or(ApiError::SessionExpired);
        }

        match self.request_refresh().await {
            Ok(tokens) => {
                let access = SecretString::from(tokens.access_token);
                session.update_tokens(access.clone(), tokens.refresh_token.map(SecretString::from));
                info!("access token refreshed");
                Ok(access)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, ending session");
                session.sign_out();
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn request_refresh(&self) -> Result<TokenResponse, ApiError> {
        let refresh_token = self
            .inner
            .session
            .refresh_token()
            .ok_or(ApiError::NotAuthenticated)?;

        let response = self
            .inner
            .client
            .post(self.url(REFRESH_PATH)?)
            .json(&RefreshRequest {
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await?;

        decode(ensure_success(response).await?).await
    }
}

// =============================================================================
// Response Handling
// =============================================================================

/// Turn any non-2xx response into `ApiError::Status`.
async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message.or(b.error));

    warn!(
        status = %status,
        body = %body.chars().take(200).collect::<String>(),
        "backend returned non-success status"
    );

    Err(ApiError::Status { status, message })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        warn!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "failed to parse backend response"
        );
        ApiError::Parse(e)
    })
}
