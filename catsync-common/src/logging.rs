//! Logging bootstrap
//!
//! `RUST_LOG` wins when set. Otherwise the configured level is used, raised
//! to `debug` for the catsync crates when verbose output is requested.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter directive used when `RUST_LOG` is absent
pub fn default_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        format!("{},catsync_engine=debug,catsync_common=debug", config.level)
    } else {
        config.level.clone()
    }
}

/// Install the global tracing subscriber
pub fn init_tracing(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config, verbose)));

    let registry = tracing_subscriber::registry().with(filter);

    match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| Error::Internal(format!("Tracing init failed: {}", e)))
}
