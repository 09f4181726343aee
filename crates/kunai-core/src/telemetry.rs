//! Tracing bootstrap for embedders and test binaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt, reload};

use crate::config::Settings;

/// Installs the global subscriber with a reloadable filter, then tightens
/// the filter to the configured level once settings are available.
///
/// ## Errors
/// Fails when a global subscriber is already installed.
pub fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(true).with_file(true).with_line_number(true))
        .try_init()?;

    if let Ok(filter) = EnvFilter::try_new(settings.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %settings.logging.level, "invalid log level in config, keeping debug");
    }
    Ok(())
}
