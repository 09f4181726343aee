//! Shared foundation for the kunai sync engine: error taxonomy, engine
//! settings, and the small value types every other crate agrees on.

pub mod config;
pub mod constants;
pub mod error;
pub mod telemetry;
pub mod types;
