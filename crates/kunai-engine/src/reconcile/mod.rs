//! Per-folder reconciliation: remote absorption and local upload.

pub mod lists;
pub mod local;
pub mod remote;

pub use remote::RemoteSummary;
