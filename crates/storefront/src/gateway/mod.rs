//! Remote data gateway for the storefront backend REST API.
//!
//! # Architecture
//!
//! - `reqwest` client shared behind an `Arc`, cheap to clone
//! - JSON request and response bodies, success is any 2xx
//! - Protected calls carry the session's bearer token; a 401 triggers one
//!   token refresh and exactly one retry of the original request
//! - A refused refresh ends the session and surfaces [`ApiError::SessionExpired`]
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::gateway::ApiClient;
//!
//! let api = ApiClient::new(&config, session.clone())?;
//!
//! // Public catalog call
//! let products: Vec<ProductRecord> = api.get("products").await?;
//!
//! // Protected call, refreshed and retried once on 401
//! let cart: Vec<CartLine> = api.authed_get(&format!("cart/{user_id}")).await?;
//! ```

mod client;

pub use client::{ApiClient, ApiRequest};

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("{}", format_status(.status, .message.as_deref()))]
    Status {
        status: StatusCode,
        /// The body's `message` field, when present.
        message: Option<String>,
    },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request path could not be joined onto the base URL.
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// A protected call was attempted with nobody signed in.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The access token expired and could not be refreshed.
    #[error("Session expired, please log in again")]
    SessionExpired,
}

impl ApiError {
    /// HTTP status of a backend rejection.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the caller should send the user back to sign-in.
    #[must_use]
    pub const fn requires_sign_in(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::SessionExpired)
    }

    /// Message suitable for a user-facing notice, preferring the backend's own.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            Self::SessionExpired => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn format_status(status: &StatusCode, message: Option<&str>) -> String {
    match message {
        Some(message) if !message.is_empty() => format!("HTTP {status}: {message}"),
        _ => format!("HTTP {status}"),
    }
}
