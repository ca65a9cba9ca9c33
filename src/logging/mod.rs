use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{Level, Subscriber, debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::config::GeneralConfig;

/// Rolling log files are named `dolby-control.log.<date>`
pub const LOG_FILE_PREFIX: &str = "dolby-control.log";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Where log output goes and how it is formatted
pub struct LoggingConfig {
    pub level: Level,
    pub file_output: bool,
    pub console_output: bool,
    pub log_dir: Option<PathBuf>,
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_output: false,
            console_output: true,
            log_dir: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Derive logging settings from the `[general]` section; `verbose` forces debug
    pub fn from_general(general: &GeneralConfig, verbose: bool, file_output: bool) -> Self {
        let level = if verbose {
            Level::DEBUG
        } else {
            general.log_level.parse().unwrap_or(Level::INFO)
        };

        Self {
            level,
            file_output,
            console_output: true,
            log_dir: general.log_dir.clone(),
            json_format: general.json_logs,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::new(format!(
            "dolby_control={}",
            self.level.as_str().to_lowercase()
        ))
    }
}

/// JSON layers always carry thread and source location. Plain layers only
/// show the source location when `with_source` is set.
fn format_layer<S, W>(json: bool, with_source: bool, ansi: bool, writer: W) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_ansi(ansi)
            .with_file(with_source)
            .with_line_number(with_source)
            .with_writer(writer)
            .boxed()
    }
}

/// Install the global subscriber for the controller and the daemon.
///
/// The returned guard flushes the file appender when dropped, so `main`
/// holds it until exit. The directory is returned when file output is on.
pub fn initialize_logging(config: LoggingConfig) -> Result<(Option<WorkerGuard>, Option<PathBuf>)> {
    let mut layers = Vec::new();

    if config.console_output {
        layers.push(format_layer(config.json_format, false, true, std::io::stdout));
    }

    let mut guard = None;
    let mut log_dir = None;
    if config.file_output {
        let dir = match config.log_dir.clone() {
            Some(dir) => dir,
            None => get_default_log_dir()?,
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let (writer, worker_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX));
        layers.push(format_layer(config.json_format, true, false, writer));
        guard = Some(worker_guard);
        log_dir = Some(dir);
    }

    tracing_subscriber::registry()
        .with(config.filter())
        .with(layers)
        .init();

    Ok((guard, log_dir))
}

/// `<data dir>/logs`, next to the engine state and pid file
pub fn get_default_log_dir() -> Result<PathBuf> {
    Ok(crate::config::types::data_dir()?.join("logs"))
}

fn is_rotated_log(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
}

/// Delete rotated log files last modified more than `keep_days` ago.
/// Returns how many were removed.
pub fn cleanup_old_logs(log_dir: &Path, keep_days: u64) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }
    let cutoff = SystemTime::now() - Duration::from_secs(60 * 60 * 24 * keep_days);

    let mut removed = 0;
    for entry in std::fs::read_dir(log_dir)? {
        let path = entry?.path();
        if !is_rotated_log(&path) {
            continue;
        }
        let Ok(modified) = path.metadata().and_then(|meta| meta.modified()) else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed expired log {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove expired log {}: {}", path.display(), e),
        }
    }

    if removed > 0 {
        info!("Removed {} expired logs from {}", removed, log_dir.display());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_level_from_general_config() {
        let general = GeneralConfig {
            log_level: "warn".to_string(),
            ..GeneralConfig::default()
        };
        assert_eq!(LoggingConfig::from_general(&general, false, false).level, Level::WARN);
        assert_eq!(LoggingConfig::from_general(&general, true, false).level, Level::DEBUG);

        let bogus = GeneralConfig {
            log_level: "loud".to_string(),
            ..GeneralConfig::default()
        };
        assert_eq!(LoggingConfig::from_general(&bogus, false, false).level, Level::INFO);
    }

    #[test]
    fn test_cleanup_keeps_recent_logs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("dolby-control.log.2026-10-18"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(cleanup_old_logs(dir.path(), 7).unwrap(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_only_rotated_logs_are_candidates() {
        let dir = TempDir::new().unwrap();
        let rotated = dir.path().join("dolby-control.log.2026-10-01");
        let foreign = dir.path().join("other.log");
        std::fs::write(&rotated, "x").unwrap();
        std::fs::write(&foreign, "x").unwrap();

        assert!(is_rotated_log(&rotated));
        assert!(!is_rotated_log(&foreign));
        assert!(!is_rotated_log(dir.path()));
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("absent"), 7).unwrap(), 0);
    }
}
