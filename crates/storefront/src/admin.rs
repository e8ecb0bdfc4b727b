//! Admin resource clients.
//!
//! Thin typed wrappers over `/admin/<resource>` endpoints. Every call goes
//! through the authenticated gateway, so a 401 is refreshed and retried once
//! like any other protected call.

use std::fmt::Display;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use shopfront_core::{AdminUser, ProductRecord, Seller, SellerId};

use crate::gateway::{ApiClient, ApiError, ApiRequest};

/// CRUD access to one admin resource.
pub struct AdminResource<T> {
    api: ApiClient,
    resource: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for AdminResource<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            resource: self.resource,
            _record: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> AdminResource<T> {
    fn new(api: ApiClient, resource: &'static str) -> Self {
        Self {
            api,
            resource,
            _record: PhantomData,
        }
    }

    fn collection(&self) -> String {
        format!("admin/{}", self.resource)
    }

    fn item(&self, id: &impl Display) -> String {
        format!("admin/{}/{id}", self.resource)
    }

    /// Resource name as it appears in the path.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.resource
    }

    /// All records.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self), fields(resource = self.resource))]
    pub async fn list(&self) -> Result<Vec<T>, ApiError> {
        self.api.authed_get(&self.collection()).await
    }

    /// One record.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, id), fields(resource = self.resource, id = %id))]
    pub async fn get(&self, id: &(impl Display + Sync)) -> Result<T, ApiError> {
        self.api.authed_get(&self.item(id)).await
    }

    /// Create a record and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, record), fields(resource = self.resource))]
    pub async fn create(&self, record: &T) -> Result<T, ApiError> {
        let request = ApiRequest::post(self.collection()).json(record)?;
        self.api.fetch_authed(request).await
    }

    /// Replace a record and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, id, record), fields(resource = self.resource, id = %id))]
    pub async fn update(&self, id: &(impl Display + Sync), record: &T) -> Result<T, ApiError> {
        let request = ApiRequest::put(self.item(id)).json(record)?;
        self.api.fetch_authed(request).await
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, id), fields(resource = self.resource, id = %id))]
    pub async fn delete(&self, id: &(impl Display + Sync)) -> Result<(), ApiError> {
        self.api.send_authed(ApiRequest::delete(self.item(id))).await
    }
}

/// Entry point to the admin resources.
#[derive(Clone)]
pub struct AdminConsole {
    api: ApiClient,
}

impl AdminConsole {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[must_use]
    pub fn products(&self) -> AdminResource<ProductRecord> {
        AdminResource::new(self.api.clone(), "products")
    }

    #[must_use]
    pub fn users(&self) -> AdminResource<AdminUser> {
        AdminResource::new(self.api.clone(), "users")
    }

    #[must_use]
    pub fn sellers(&self) -> AdminResource<Seller> {
        AdminResource::new(self.api.clone(), "sellers")
    }

    /// Approve a seller account.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self), fields(seller_id = %id))]
    pub async fn approve_seller(&self, id: &SellerId) -> Result<Seller, ApiError> {
        self.api
            .fetch_authed(ApiRequest::post(format!("admin/sellers/{id}/approve")))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::session::Session;

    fn console() -> AdminConsole {
        let config = StorefrontConfig::new(Url::parse("http://127.0.0.1:9/").unwrap());
        AdminConsole::new(ApiClient::new(&config, Session::new()).unwrap())
    }

    #[test]
    fn test_resource_paths() {
        let sellers = console().sellers();
        assert_eq!(sellers.name(), "sellers");
        assert_eq!(sellers.collection(), "admin/sellers");
        assert_eq!(sellers.item(&SellerId::new("s1")), "admin/sellers/s1");
    }

    #[tokio::test]
    async fn test_requires_sign_in() {
        let err = console().users().list().await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
    }
}
