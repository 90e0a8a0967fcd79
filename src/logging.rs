//! File-based tracing output.
//!
//! The TUI owns the terminal, so log lines go to `<cache_dir>/dexview/dexview.log`
//! only. `DEXVIEW_LOG` takes an `EnvFilter` directive and defaults to `info`.

use std::path::PathBuf;

use directories::BaseDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "DEXVIEW_LOG";
const LOG_FILE: &str = "dexview.log";

pub fn log_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|base| base.cache_dir().join("dexview"))
}

/// Install the global subscriber.
///
/// The returned guard must live until shutdown so buffered lines are flushed. `None`
/// means logging is disabled because the log directory could not be created.
pub fn init() -> Option<WorkerGuard> {
    let dir = log_dir()?;
    if let Err(e) = std::fs::create_dir_all(&dir) {
        // No subscriber yet
        eprintln!(
            "warning: failed to create log directory {}: {}",
            dir.display(),
            e
        );
        return None;
    }

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init();
    if installed.is_err() {
        return None;
    }

    tracing::info!(path = %dir.join(LOG_FILE).display(), "logging initialized");
    Some(guard)
}
