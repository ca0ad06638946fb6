// User Domain Model

use serde::{Deserialize, Serialize};

/// User ID (store-assigned)
pub type UserId = i64;

/// One record per external identity. Address and display name are refreshed
/// on every interaction (upsert semantics); records are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Stable identifier from the external identity provider
    pub external_id: String,
    /// Delivery address for dispatch notices
    pub address: String,
    pub display_name: String,
}

/// Identity snapshot presented by an entry point on each interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub external_id: String,
    pub address: String,
    pub display_name: String,
}

impl UserProfile {
    pub fn new(
        external_id: impl Into<String>,
        address: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            address: address.into(),
            display_name: display_name.into(),
        }
    }
}
