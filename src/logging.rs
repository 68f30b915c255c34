use std::io::{IsTerminal, stderr};

use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

use crate::domain::Error;

/// Installs the global subscriber. `RUST_LOG` overrides `default_level`.
/// Logs go to stderr; stdout carries the balance report.
pub fn init_logger(default_level: &str) -> Result<(), Error> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console_layer = fmt::layer()
        .with_writer(stderr)
        .with_ansi(stderr().is_terminal())
        .with_level(true)
        .with_target(true)
        .compact()
        .with_filter(env_filter);

    registry()
        .with(console_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("logger already initialised: {}", e)))
}
