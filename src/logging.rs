// File: src/logging.rs
//! Process-wide logger.
//!
//! Lines go to stderr tagged `[predict LEVEL]` and, once a log file is
//! attached, are appended to that file as well.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::LazyLock;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        };
        f.write_str(tag)
    }
}

pub struct Logger {
    level: AtomicU8,
    stderr: AtomicU8,
    file: Mutex<Option<File>>,
}

pub static LOGGER: LazyLock<Logger> = LazyLock::new(Logger::new);

impl Logger {
    fn new() -> Self {
        Self {
            level: AtomicU8::new(Level::Warn as u8),
            stderr: AtomicU8::new(1),
            file: Mutex::new(None),
        }
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Interactive front ends draw on the terminal and turn stderr echo off.
    pub fn set_stderr(&self, enabled: bool) {
        self.stderr.store(enabled as u8, Ordering::Relaxed);
    }

    /// Appends all further log lines to `path`.
    pub fn attach_file(&self, path: &Path) -> std::io::Result<()> {
        let file = File::options().create(true).append(true).open(path)?;
        *self.file.lock() = Some(file);
        Ok(())
    }

    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let line = format!("[predict {}] {}", level, args);
        if self.stderr.load(Ordering::Relaxed) == 1 {
            eprintln!("{}", line);
        }
        if let Some(file) = self.file.lock().as_mut() {
            // A failing log sink must never fail a prediction.
            let _ = writeln!(file, "{}", line);
        }
    }
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::logging::LOGGER.log($crate::logging::Level::Error, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::logging::LOGGER.log($crate::logging::Level::Warn, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::logging::LOGGER.log($crate::logging::Level::Info, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::logging::LOGGER.log($crate::logging::Level::Debug, format_args!($($arg)*)) };
}
