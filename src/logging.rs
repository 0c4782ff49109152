// src/logging.rs
// Timestamped logging for the mainstage hub and clients.

use chrono::Local;

#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Format and print a log message with timestamp. Errors go to stderr,
/// everything else to stdout.
pub fn log_message(level: LogLevel, message: &str) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    match level {
        LogLevel::Error => eprintln!("{} - {} - {}", timestamp, level.as_str(), message),
        _ => println!("{} - {} - {}", timestamp, level.as_str(), message),
    }
}

pub fn log_info(message: &str) {
    log_message(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_message(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_message(LogLevel::Error, message);
}
