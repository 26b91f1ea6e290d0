//! Tracing setup for the `kwscout` binary.
//!
//! Stderr gets the configured level (or `KWSCOUT_LOG` / `RUST_LOG` when set).
//! When a log file is given it additionally receives everything at debug
//! level and above, without ANSI colors.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use kwscout::{SearchError, SearchResult};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

fn stderr_filter(level: &str) -> EnvFilter {
    let from_env = std::env::var("KWSCOUT_LOG").or_else(|_| std::env::var("RUST_LOG"));
    if let Ok(filter) = from_env {
        if let Ok(filter) = EnvFilter::try_new(&filter) {
            return filter;
        }
        eprintln!("Warning: Invalid log filter '{}', using '{}'", filter, level);
    }
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber. Calling it twice is a no-op.
pub fn init(level: &str, log_file: Option<&Path>) -> SearchResult<()> {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter(level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| SearchError::from_io(path, e))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}
