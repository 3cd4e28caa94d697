//! Logger utility for application-wide logging
//!
//! A `log::Log` implementation that writes every record to a log file and
//! mirrors it to stdout. Without a log file the console logger from
//! `env_logger` is used instead.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::errors::{SceneError, SceneResult};

/// File logger with console mirror
pub struct Logger {
    file: Mutex<File>,
    level: Level,
}

impl Logger {
    /// Creates (truncates) the log file
    pub fn new(log_file: &Path, level: Level) -> io::Result<Self> {
        let file = File::create(log_file)?;
        Ok(Logger { file: Mutex::new(file), level })
    }

    /// Appends one line to the log file
    pub fn write_line(&self, message: &str) -> io::Result<()> {
        match self.file.lock() {
            Ok(mut file) => {
                writeln!(file, "{}", message)?;
                file.flush()
            }
            Err(_) => Err(io::Error::new(io::ErrorKind::Other, "log file lock poisoned")),
        }
    }

    /// Installs a file logger as the global `log` backend
    pub fn init_global_logger(log_file: &Path, level: Level) -> SceneResult<()> {
        let logger = Logger::new(log_file, level)?;
        log::set_boxed_logger(Box::new(logger))
            .map_err(|e| SceneError::GenericError(format!("Logger already initialized: {}", e)))?;
        log::set_max_level(level.to_level_filter());
        Ok(())
    }

    /// Installs `env_logger` on stderr; `RUST_LOG` overrides `level`
    pub fn init_console_logger(level: LevelFilter) -> SceneResult<()> {
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init()
            .map_err(|e| SceneError::GenericError(format!("Logger already initialized: {}", e)))
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = self.write_line(&message);

            println!("{}", message);
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn records_at_or_above_level_reach_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = Logger::new(&path, Level::Info).unwrap();

        logger.log(&Record::builder().level(Level::Warn).args(format_args!("cloudy scene")).build());
        logger.log(&Record::builder().level(Level::Debug).args(format_args!("hidden")).build());
        logger.flush();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[WARN] cloudy scene"));
        assert!(!content.contains("hidden"));
    }
}
