use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants;

/// Engine-wide tunables. Embedders usually run with the defaults; every
/// value can be overridden via environment variables or a `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub transport: TransportConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Per-request timeout in seconds; a timeout surfaces as a network
    /// error subject to the same soft-fail rules as any other.
    pub timeout_secs: u64,
    pub auth_retries: u8,
    pub redirect_limit: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Multiget and delete dispatch batch size.
    pub batch_size: usize,
    /// CTAG stabilization bound; exceeding it is a hard sync failure.
    pub ctag_bound: u32,
    /// Pause between delete batches, purely for UI pacing.
    pub delete_pause_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads settings from environment variables and an optional
    /// `config.toml`, with code-level defaults underneath.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it
    /// fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("transport.timeout_secs", 30)?
            .set_default(
                "transport.auth_retries",
                i64::from(constants::DEFAULT_AUTH_RETRIES),
            )?
            .set_default(
                "transport.redirect_limit",
                i64::from(constants::DEFAULT_REDIRECT_LIMIT),
            )?
            .set_default(
                "sync.batch_size",
                i64::try_from(constants::DEFAULT_BATCH_SIZE)?,
            )?
            .set_default("sync.ctag_bound", i64::from(constants::DEFAULT_CTAG_BOUND))?
            .set_default("sync.delete_pause_ms", 250)?
            .set_default("logging.level", "info")?
            .add_source(
                config::Environment::with_prefix("KUNAI")
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transport: TransportConfig {
                timeout_secs: 30,
                auth_retries: constants::DEFAULT_AUTH_RETRIES,
                redirect_limit: constants::DEFAULT_REDIRECT_LIMIT,
            },
            sync: SyncConfig {
                batch_size: constants::DEFAULT_BATCH_SIZE,
                ctag_bound: constants::DEFAULT_CTAG_BOUND,
                delete_pause_ms: 250,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

/// ## Summary
/// Loads `.env` then the layered settings.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
