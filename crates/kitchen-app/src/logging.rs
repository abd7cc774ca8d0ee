use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

const DEFAULT_LOG_FILE: &str = "kitchen-trust.jsonl";

pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
    log_path: Option<PathBuf>,
}

/// Installs the global subscriber: JSON lines to a file when structured
/// logging is enabled, compact stderr output otherwise. `RUST_LOG` takes
/// precedence over the configured level.
pub fn init_logging(logging: &LoggingConfig) -> Result<LoggingGuard> {
    let level = logging.level().unwrap_or(Level::INFO);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if !logging.enable_structured {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .compact()
            .with_writer(std::io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
        return Ok(LoggingGuard {
            _guard: None,
            log_path: None,
        });
    }

    let log_path = logging
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    if let Some(dir) = log_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory at {}", dir.display()))?;
    }
    let file = File::create(&log_path)
        .with_context(|| format!("creating log file at {}", log_path.display()))?;

    let (writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(file);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    // Ignore error if a global subscriber is already set (e.g., when running in tests)
    let _ = tracing::subscriber::set_global_default(subscriber);

    Ok(LoggingGuard {
        _guard: Some(guard),
        log_path: Some(log_path),
    })
}

impl LoggingGuard {
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }
}
