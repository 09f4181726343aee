//! WebDAV XML codec: multistatus parsing, node-path evaluation, and the
//! request bodies the engine sends.
//!
//! Responses are parsed into a plain [`XmlNode`] tree with resolved
//! namespaces; callers extract typed values with the path evaluator
//! instead of a full schema. Request bodies are hand-assembled strings
//! with explicit namespace declarations, matching what DAV servers are
//! actually tested against in the wild.

pub mod build;
pub mod multistatus;
pub mod namespace;
pub mod node;
pub mod parse;

pub use multistatus::{MsEntry, MultiStatus};
pub use namespace::{CALDAV_NS, CARDDAV_NS, CS_NS, DAV_NS};
pub use node::XmlNode;
pub use parse::{parse_document, sanitize_xml};
