//! The kunai synchronization engine.
//!
//! Everything above the transport lives here: the account/folder/contact
//! model, the bidirectional vCard field mapper, WebDAV discovery, and the
//! per-folder change reconciliation engine. The embedding application
//! supplies persistence and credentials through the traits in [`store`]
//! and drives a sync via [`engine::ReconciliationEngine`] and
//! [`discovery::DiscoveryService`].

pub mod discovery;
pub mod engine;
pub mod mapper;
pub mod model;
pub mod reconcile;
pub mod store;
