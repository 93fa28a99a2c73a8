//! Tracing setup for lumen binaries.
//!
//! Filtering follows `RUST_LOG` with an `info` default. File output is
//! opt-in through configuration: when the server config names a log
//! directory, a daily-rolling `<app>.log` is written there; otherwise
//! everything goes to the console. There is no platform-specific directory
//! guessing — operators say where logs go.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Server subscriber: console, plus a daily-rolling `<app_name>.log` under
/// `directory` when one is configured.
pub fn init_server(app_name: &str, directory: Option<&Path>) -> io::Result<()> {
    let console = fmt::layer().with_target(true);
    let registry = Registry::default().with(env_filter()).with(console);

    match directory {
        Some(directory) => {
            fs::create_dir_all(directory)?;
            let file = fmt::layer()
                .with_writer(rolling::daily(directory, format!("{app_name}.log")))
                .with_ansi(false);
            tracing::subscriber::set_global_default(registry.with(file))
        }
        None => tracing::subscriber::set_global_default(registry),
    }
    .map_err(|error| io::Error::other(error.to_string()))
}
