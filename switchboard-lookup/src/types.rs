//! Lookup service resource types.
//!
//! Unknown fields are ignored so newer API revisions keep decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use switchboard_core::Snowflake;

/// A message that was re-posted by the proxy on behalf of a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxiedMessage {
    /// Id of the proxied (re-posted) message.
    pub id: Snowflake,
    /// Id of the user's original, deleted message.
    #[serde(default)]
    pub original: Option<Snowflake>,
    /// Account that sent the original message.
    pub sender: Snowflake,
    pub channel: Snowflake,
    #[serde(default)]
    pub guild: Option<Snowflake>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub system: Option<ProxySystem>,
    #[serde(default)]
    pub member: Option<ProxyMember>,
}

impl ProxiedMessage {
    /// Name to attribute the message to: the member's display name, then the
    /// member name, then the system name.
    pub fn author_name(&self) -> Option<&str> {
        self.member
            .as_ref()
            .map(ProxyMember::display_name)
            .or_else(|| self.system.as_ref().and_then(|s| s.name.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySystem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ProxyMember {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}
