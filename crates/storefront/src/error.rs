//! Unified error type for callers of the storefront client.
//!
//! Each layer has its own error enum; `AppError` folds them together for
//! front ends (the CLI) that only need to report, redirect to sign-in, or
//! forward server faults to error tracking.

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::gateway::ApiError;
use crate::queries::QueryError;
use crate::snapshot::SnapshotError;
use crate::stores::{CatalogError, StoreError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller input was rejected before any request.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) | Self::Catalog(CatalogError::Api(e)) => Some(e),
            Self::Store(e) => e.api_error(),
            Self::Query(e) => Some(e.api_error()),
            _ => None,
        }
    }

    /// Whether the user has to sign in (again) before retrying.
    #[must_use]
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotAuthenticated))
            || self.api().is_some_and(ApiError::requires_sign_in)
    }

    /// Whether this is a fault worth reporting to error tracking, rather than
    /// a user mistake or an expected rejection.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::Cache(_) | Self::Snapshot(_) | Self::Catalog(CatalogError::Cache(_)) => true,
            Self::Config(_) | Self::NotFound(_) | Self::BadRequest(_) => false,
            _ => self.api().is_some_and(|e| match e {
                ApiError::Status { status, .. } => status.is_server_error(),
                ApiError::Http(_) | ApiError::Parse(_) | ApiError::Url(_) => true,
                ApiError::NotAuthenticated | ApiError::SessionExpired => false,
            }),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
