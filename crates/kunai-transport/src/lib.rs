//! HTTP transport for the kunai sync engine.
//!
//! One entry point: [`Transport::send`]. The concrete [`DavClient`]
//! resolves paths against the connection origin, follows redirects
//! manually so the connection tracks the discovered origin, retries 401s
//! with optionally re-prompted credentials, resolves the RFC 6764
//! bootstrap pseudo-scheme via DNS, and normalizes 207 bodies into the
//! multistatus entry list. Everything above it (discovery, reconciliation)
//! sees [`DavResponse`] and nothing of HTTP.

pub mod caches;
pub mod client;
pub mod connection;
pub mod discover;
pub mod request;
pub mod response;

pub use caches::TransportCaches;
pub use client::DavClient;
pub use connection::{Connection, CredentialPrompter, Credentials, NoPrompt};
pub use discover::{DiscoveredRoot, DnsLookup, HickoryDns, SrvTarget};
pub use request::{DavRequest, Method};
pub use response::DavResponse;

use kunai_core::error::SyncResult;

/// The seam between the engine and HTTP.
///
/// The engine is generic over this; tests drive it with a scripted
/// implementation instead of a network.
pub trait Transport {
    fn send(
        &self,
        request: DavRequest,
        conn: &mut Connection,
    ) -> impl Future<Output = SyncResult<DavResponse>>;

    /// Pre-flags a host whose challenge handling is known broken, so the
    /// first request already carries the hand-built Basic header.
    /// Transports without an auth cache ignore this.
    fn note_problematic_host(&self, _host: &str) {}
}
