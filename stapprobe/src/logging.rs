use anyhow::Result;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::LogLevel;

static INIT_GUARD: OnceLock<()> = OnceLock::new();

/// RUST_LOG wins over the configured level
fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.to_tracing_level_filter().into())
        .from_env_lossy()
}

/// Install the global subscriber.
///
/// `log_file` enables the file layer; `console` adds a stderr layer (stdout
/// carries the suite report). Subsequent calls are no-ops.
pub fn initialize_logging(log_file: Option<&Path>, console: bool, level: LogLevel) -> Result<()> {
    if INIT_GUARD.set(()).is_err() {
        // Already initialized elsewhere; do nothing and succeed
        return Ok(());
    }

    let mut console = console;
    let file_layer = match log_file {
        Some(path) => match std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
        {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(Mutex::new(file))
                    .with_target(true)
                    .with_ansi(false)
                    .with_filter(build_filter(level)),
            ),
            Err(e) => {
                // Fallback to console only if file creation fails
                eprintln!("Failed to open log file '{}': {}", path.display(), e);
                console = true;
                None
            }
        },
        None => None,
    };

    let console_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(build_filter(level))
    });

    let init_res = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();
    let _ = init_res; // ignore AlreadyInit errors silently

    Ok(())
}
