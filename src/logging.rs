use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = "mlb_terminal";
const LOG_FILE: &str = "mlb_terminal.log";

/// Where log output should go when `MLB_LOG_PATH` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    /// Headless runs and tools.
    Stderr,
    /// The terminal UI owns the screen, so logs go to a file in the cache dir.
    CacheFile,
}

/// Initialize logging. `RUST_LOG` is honored; otherwise `info`, or `debug` when asked.
/// Returns the file being written to, if any.
pub fn init_logging(debug: bool, sink: LogSink) -> Option<PathBuf> {
    let default_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let path = std::env::var("MLB_LOG_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| match sink {
            LogSink::CacheFile => log_path(),
            LogSink::Stderr => None,
        });

    if let Some(path) = path
        && let Some(file) = open_log(&path)
    {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(file)
            .try_init();
        return Some(path);
    }

    match sink {
        LogSink::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(io::stderr)
                .try_init();
        }
        LogSink::CacheFile => {
            // Nowhere safe to write while the UI is up.
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
    None
}

fn open_log(path: &PathBuf) -> Option<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

fn log_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(LOG_DIR).join(LOG_FILE));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(LOG_DIR).join(LOG_FILE))
}
