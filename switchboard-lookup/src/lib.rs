//! switchboard lookup
//!
//! Memoized client for the remote proxied-message lookup service. The
//! client consults a shared bounded recency cache before issuing a request,
//! stores successful results, and classifies HTTP failures so callers can
//! treat "not found" as an ordinary absent value.

pub mod client;
pub mod transport;
pub mod types;

pub use client::{LookupClient, MessageCache};
pub use transport::{LookupTransport, ReqwestTransport, TransportFailure, TransportResponse};
pub use types::{ProxiedMessage, ProxyMember, ProxySystem};
