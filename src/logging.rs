//! tracing subscriber setup.
//!
//! The TUI owns the terminal, so in TUI mode logs go to a file and nowhere
//! else. Line and JSON modes log to stderr.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to the log file; drop logs if it cannot be opened.
    File,
    Stderr,
}

/// Where log lines actually end up once the target has been resolved.
enum LogSink {
    Stderr,
    File { path: PathBuf, file: File },
    Off,
}

impl LogSink {
    /// Resolve `target`, collecting the reasons any log file was skipped.
    fn resolve(target: LogTarget) -> (Self, Vec<String>) {
        match target {
            LogTarget::Stderr => (LogSink::Stderr, Vec::new()),
            LogTarget::File => {
                let mut skipped = Vec::new();
                for path in log_file_candidates() {
                    match open_append(&path) {
                        Ok(file) => return (LogSink::File { path, file }, skipped),
                        Err(e) => skipped.push(format!("{e:#}")),
                    }
                }
                (LogSink::Off, skipped)
            }
        }
    }

    fn default_level(&self) -> &'static str {
        match self {
            LogSink::Stderr => "warn",
            LogSink::File { .. } | LogSink::Off => "info",
        }
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

pub fn init_tracing(target: LogTarget) {
    let (sink, skipped) = LogSink::resolve(target);
    let filter = env_filter(sink.default_level());

    let mut log_path = None;
    let (stderr_layer, file_layer) = match sink {
        LogSink::Stderr => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogSink::File { path, file } => {
            log_path = Some(path);
            let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        // No log file: no logs rather than writing over the TUI.
        LogSink::Off => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_path {
        tracing::info!(path = %path.display(), "logging initialized");
    }
    for reason in skipped {
        tracing::warn!("{reason}");
    }
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(data) = dirs::data_dir() {
        candidates.push(data.join("phonetic").join("phonetic.log"));
    }
    candidates.push(std::env::temp_dir().join("phonetic.log"));
    candidates
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}
