//! Logging configuration and initialization.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{ChatError, Result};

/// Parse log level string to tracing Level.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(parse_level(level).into())
}

/// Open (and create the parent directory of) the log file.
fn open_log_file(path: &str) -> Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed in this process.
fn install(writer: BoxMakeWriter, ansi: bool, level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true),
        )
        .with(build_filter(level))
        .try_init()
        .map_err(|e| ChatError::Config(format!("logging already initialized: {e}")))
}

/// Initialize the logging system with the given configuration.
///
/// Always logs to stdout; additionally writes to `config.file` when set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    match config.file.as_deref() {
        Some(path) => {
            let log_file = Arc::new(open_log_file(path)?);
            let writer = BoxMakeWriter::new(std::io::stdout.and(log_file));
            install(writer, false, &config.level)
        }
        None => install(BoxMakeWriter::new(std::io::stdout), true, &config.level),
    }
}

/// Initialize console-only logging.
///
/// Used as the fallback when [`init`] fails; an already installed subscriber
/// is left in place.
pub fn init_console_only(level: &str) {
    if let Err(e) = install(BoxMakeWriter::new(std::io::stdout), true, level) {
        eprintln!("{e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("info"), Level::INFO);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("ERROR"), Level::ERROR);
    }

    #[test]
    fn test_parse_level_default() {
        assert_eq!(parse_level("invalid"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_build_filter_uses_level() {
        let filter = build_filter("debug").to_string();
        assert!(filter.contains("debug"), "filter was {filter}");
    }

    #[test]
    fn test_open_log_file_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatroom.log");
        fs::write(&path, "stale").unwrap();

        open_log_file(path.to_str().unwrap()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    // The only test in this crate that installs the global subscriber.
    #[test]
    fn test_init_writes_file_and_rejects_second_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/chatroom.log");
        let config = LoggingConfig {
            level: "info".to_string(),
            file: Some(path.to_str().unwrap().to_string()),
        };

        init(&config).unwrap();
        tracing::info!(subscriber = "abc", "logging to file works");

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("logging to file works"));
        assert!(contents.contains("subscriber=\"abc\""));

        assert!(matches!(
            init(&LoggingConfig::default()),
            Err(ChatError::Config(_))
        ));
        // The fallback keeps the installed subscriber instead of panicking.
        init_console_only("debug");
    }

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/chatroom.log");

        let file = open_log_file(path.to_str().unwrap());
        assert!(file.is_ok());
        assert!(path.exists());
    }
}
