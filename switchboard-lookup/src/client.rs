//! Cached lookup client.

use crate::transport::{LookupTransport, ReqwestTransport, TransportResponse};
use crate::types::{ApiErrorBody, ProxiedMessage};
use std::fmt;
use std::sync::Arc;
use switchboard_core::{
    LookupConfig, LookupError, LruCache, Snowflake, SwitchboardError, SwitchboardResult,
    STATUS_NOT_FOUND,
};
use tracing::{debug, error, warn};

/// Cache of decoded messages keyed by message id.
pub type MessageCache = LruCache<String, ProxiedMessage>;

/// Client for `GET {base_url}/messages/{id}`.
///
/// Successful lookups are memoized in a shared [`MessageCache`]; a cached id
/// never hits the network again until it is evicted. Failures are never
/// cached.
pub struct LookupClient<T = ReqwestTransport> {
    transport: T,
    base_url: String,
    cache: Arc<MessageCache>,
}

impl LookupClient<ReqwestTransport> {
    /// Build a client with a `reqwest` transport and a fresh cache sized
    /// from `config`.
    pub fn from_config(config: &LookupConfig) -> SwitchboardResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config).map_err(|e| {
            SwitchboardError::Lookup(LookupError::Transport {
                path: config.base_url.clone(),
                reason: e.to_string(),
            })
        })?;
        let cache = Arc::new(MessageCache::new(config.cache_capacity)?);
        Ok(Self::new(transport, &config.base_url, cache))
    }
}

impl<T: LookupTransport> LookupClient<T> {
    pub fn new(transport: T, base_url: &str, cache: Arc<MessageCache>) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    pub fn cache(&self) -> &MessageCache {
        &self.cache
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch a message by id, consulting the cache first.
    ///
    /// # Errors
    /// - [`LookupError::RemoteFault`] for any non-2xx status, including 404
    /// - [`LookupError::Transport`] if no response was received
    /// - [`LookupError::Decode`] if the body is not a valid message
    pub async fn fetch(&self, id: impl fmt::Display) -> Result<ProxiedMessage, LookupError> {
        let id = id.to_string();

        if let Some(cached) = self.cache.get(id.as_str()) {
            debug!(message_id = %id, "/messages/{} -> cache hit", id);
            return Ok(cached);
        }

        let path = format!("/messages/{}", id);
        let url = format!("{}{}", self.base_url, path);

        let response = match self.transport.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                error!(message_id = %id, error = %e, "{} -> transport failure", path);
                return Err(LookupError::Transport {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        if !response.is_success() {
            return Err(remote_fault(path, &response));
        }

        let message: ProxiedMessage =
            serde_json::from_slice(&response.body).map_err(|e| {
                error!(message_id = %id, error = %e, "{} -> undecodable body", path);
                LookupError::Decode {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;

        self.cache.put(id, message.clone());
        debug!("{} -> {}", path, response.status);

        Ok(message)
    }

    /// Like [`fetch`](Self::fetch), but a 404 yields `Ok(None)`.
    pub async fn fetch_or_absent(
        &self,
        id: impl fmt::Display,
    ) -> Result<Option<ProxiedMessage>, LookupError> {
        match self.fetch(id).await {
            Ok(message) => Ok(Some(message)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn fetch_message(&self, id: Snowflake) -> Result<ProxiedMessage, LookupError> {
        self.fetch(id).await
    }

    pub async fn fetch_message_or_absent(
        &self,
        id: Snowflake,
    ) -> Result<Option<ProxiedMessage>, LookupError> {
        self.fetch_or_absent(id).await
    }
}

/// Log a non-2xx response at a severity matching how expected it is, and
/// convert it into a [`LookupError::RemoteFault`].
fn remote_fault(path: String, response: &TransportResponse) -> LookupError {
    let status = response.status;
    let cause = match serde_json::from_slice::<ApiErrorBody>(&response.body) {
        Ok(body) => match body.code {
            Some(code) => format!("{} (code {})", body.message, code),
            None => body.message,
        },
        Err(_) if response.body.is_empty() => format!("HTTP {}", status),
        Err(_) => response.body_text(),
    };

    match status {
        STATUS_NOT_FOUND => debug!(status, "{} -> {}", path, status),
        400..=599 => error!(status, cause = %cause, "{} -> {}", path, status),
        _ => warn!(status, cause = %cause, "{} -> unexpected status {}", path, status),
    }

    LookupError::RemoteFault {
        path,
        status,
        cause,
    }
}

impl<T> fmt::Debug for LookupClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupClient")
            .field("base_url", &self.base_url)
            .field("cached", &self.cache.len())
            .field("capacity", &self.cache.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_fault_uses_api_message() {
        let response = TransportResponse::new(
            404,
            br#"{"message":"Message not found.","code":20006}"#.to_vec(),
        );
        let err = remote_fault("/messages/1".to_string(), &response);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Message not found. (code 20006)"));
    }

    #[test]
    fn test_remote_fault_falls_back_to_status() {
        let err = remote_fault("/messages/1".to_string(), &TransportResponse::new(502, Vec::new()));
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("HTTP 502"));
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = LookupConfig::default().with_cache_capacity(0);
        assert!(LookupClient::from_config(&config).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = LookupConfig::default().with_base_url("https://example.test/v2/");
        let client = LookupClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://example.test/v2");
    }
}
