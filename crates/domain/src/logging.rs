//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Install the global subscriber.  `RUST_LOG` wins over `cfg.filter`.
///
/// Fails (rather than panicking) when a subscriber is already installed, so
/// embedding hosts that configure logging themselves can ignore the error.
pub fn init_tracing(cfg: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.filter))
        .map_err(|e| Error::Config(format!("logging.filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if cfg.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    installed.map_err(|e| Error::Other(format!("tracing subscriber: {e}")))
}
