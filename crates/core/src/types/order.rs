//! Orders and after-sale (cancellation / return) requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{OrderId, RequestId, UserId};
use super::price::Price;
use super::product::ProductRef;
use super::status::{OrderStatus, RequestStatus};

/// An order placed by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub user: UserId,
    pub items: Vec<OrderItem>,
    pub total: Price,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// One purchased product within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: ProductRef,
    pub quantity: u32,
    pub price: Price,
}

/// A request to cancel an order before it ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationRequest {
    #[serde(rename = "_id")]
    pub id: RequestId,
    pub order: OrderId,
    pub reason: String,
    #[serde(default)]
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// A request to return a delivered order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[serde(rename = "_id")]
    pub id: RequestId,
    pub order: OrderId,
    pub reason: String,
    #[serde(default)]
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}
