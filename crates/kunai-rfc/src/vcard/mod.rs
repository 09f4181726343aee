//! vCard 3.0 codec (RFC 2426 semantics with vendor extensions).
//!
//! A parsed card is an ordered map from lower-cased item name to the list
//! of entries for that item. Entry values are either plain text or an
//! array of components for structured items (N, ADR, ORG, GEO); entry
//! parameters are kept as upper-case token lists.
//!
//! Generation is the exact inverse of parsing with canonical ordering, so
//! `generate(parse(x))` is idempotent after one normalization pass. The
//! engine relies on that: comparing generated text is the sole signal for
//! "did this contact actually change" before an upload.

pub mod build;
pub mod core;
pub mod lexer;
pub mod parse;

pub use build::generate;
pub use core::{EntryValue, Meta, VCard, VCardEntry};
pub use parse::{ParseError, ParseResult, parse};
