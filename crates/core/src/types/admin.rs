//! Records managed from the admin console.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{SellerId, UserId};
use super::status::Role;

/// A user account as listed in the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub role: Role,
}

/// A marketplace seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SellerId>,
    pub name: String,
    pub email: Email,
    pub store_name: String,
    #[serde(default)]
    pub approved: bool,
}
