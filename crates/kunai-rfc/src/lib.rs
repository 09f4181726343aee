//! Wire-format codecs for the kunai sync engine.
//!
//! Two families live here:
//!
//! - [`vcard`] — vCard 3.0 text to/from the entry-map model the field
//!   mapper works against, with exact-inverse generation so that textual
//!   comparison of generated cards is a reliable "did anything change"
//!   signal.
//! - [`dav`] — WebDAV multistatus XML into a traversable node model, a
//!   node-path evaluator for property extraction, and the hand-assembled
//!   request bodies the engine sends.

pub mod dav;
pub mod error;
pub mod vcard;
