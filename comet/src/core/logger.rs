//! Leveled, prefixed logging for plugins.
//!
//! Comet logs through the [`log`] facade. [`install`] registers a [`ChannelLogger`] that formats
//! records as `[prefix] [LVL] message` and forwards them over a channel, leaving the host side
//! free to print them wherever its output lives.
//!
//! The framework's own bookkeeping ("Initialized System (...)", "Resolved dependency ...") is
//! logged at `trace` and only shows at [`LogLevel::System`].
//!
//! `log` has no level above `error`, so fatal errors are `error` records sent to
//! [`FATAL_TARGET`], normally through [`fatal!`](crate::fatal). At [`LogLevel::Fatal`] the logger
//! keeps only those and drops plain `error!` records.

use std::sync::{OnceLock, PoisonError, RwLock};

use crossbeam::channel::{Receiver, Sender, unbounded};
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use serde::Deserialize;

/// Log target marking an `error` record as fatal.
pub const FATAL_TARGET: &str = "comet::fatal";

/// Log a fatal error.
///
/// ```rust,ignore
/// comet::fatal!("Launch failed: {err}");
/// ```
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::log::error!(target: $crate::core::logger::FATAL_TARGET, $($arg)+)
    };
}

/// Determines the depth of logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Everything is logged, including Comet's internal messages.
    System,
    Verbose,
    Warning,
    Error,
    /// Only fatal errors are logged.
    #[default]
    Fatal,
    /// Nothing is logged.
    Silent,
}

impl LogLevel {
    /// The `log` filter corresponding to this level.
    ///
    /// [`LogLevel::Fatal`] maps to `Error` because fatal records are `error` records. The
    /// [`ChannelLogger`] then narrows it to [`FATAL_TARGET`].
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::System => LevelFilter::Trace,
            LogLevel::Verbose => LevelFilter::Debug,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Error | LogLevel::Fatal => LevelFilter::Error,
            LogLevel::Silent => LevelFilter::Off,
        }
    }
}

/// Runtime logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    pub level: LogLevel,
    /// Prepend the level tag, e.g. `[WARN]`.
    pub show_level: bool,
    /// Prepend a name, usually the app's, e.g. `[My Plugin]`.
    pub prefix: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            show_level: true,
            prefix: None,
        }
    }
}

/// A formatted log line.
#[derive(Debug, Clone)]
pub struct LogMessage {
    pub level: Level,
    pub message: String,
}

/// A [`log::Log`] implementation that forwards formatted lines over a channel.
pub struct ChannelLogger {
    sender: Sender<LogMessage>,
    config: RwLock<LoggerConfig>,
}

fn is_fatal(metadata: &Metadata) -> bool {
    metadata.level() == Level::Error && metadata.target() == FATAL_TARGET
}

impl log::Log for ChannelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config().level {
            LogLevel::Fatal => is_fatal(metadata),
            level => metadata.level() <= level.filter(),
        }
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let tag = if is_fatal(record.metadata()) {
                "FATAL"
            } else {
                tag(record.level())
            };
            let _ = self.sender.try_send(LogMessage {
                level: record.level(),
                message: self.line(tag, &record.args().to_string()),
            });
        }
    }

    fn flush(&self) {}
}

impl ChannelLogger {
    pub fn new(sender: Sender<LogMessage>, config: LoggerConfig) -> Self {
        Self {
            sender,
            config: RwLock::new(config),
        }
    }

    pub fn with_receiver(config: LoggerConfig) -> (Self, Receiver<LogMessage>) {
        let (sender, receiver) = unbounded();
        (Self::new(sender, config), receiver)
    }

    /// Replace the logger's settings.
    pub fn configure(&self, config: LoggerConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// The logger's current settings.
    pub fn config(&self) -> LoggerConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Format a line according to the current settings.
    pub fn format(&self, level: Level, message: &str) -> String {
        self.line(tag(level), message)
    }

    fn line(&self, tag: &str, message: &str) -> String {
        let config = self.config();
        let mut line = String::new();
        if let Some(prefix) = &config.prefix {
            line.push_str(&format!("[{prefix}] "));
        }
        if config.show_level {
            line.push_str(&format!("[{tag}] "));
        }
        line.push_str(message);
        line
    }
}

fn tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERR",
        Level::Warn => "WARN",
        Level::Info => "VRB",
        Level::Debug => "DBG",
        Level::Trace => "SYS",
    }
}

static LOGGER: OnceLock<ChannelLogger> = OnceLock::new();

/// Register a [`ChannelLogger`] as the global logger and return the receiving end.
///
/// Fails if a logger is already installed.
pub fn install(config: LoggerConfig) -> Result<Receiver<LogMessage>, SetLoggerError> {
    let (logger, receiver) = ChannelLogger::with_receiver(config.clone());
    let logger = LOGGER.get_or_init(|| logger);
    log::set_logger(logger)?;
    logger.configure(config.clone());
    log::set_max_level(config.level.filter());
    Ok(receiver)
}

/// Update the installed logger's settings. Does nothing if [`install`] was never called.
pub fn configure(config: LoggerConfig) {
    if let Some(logger) = LOGGER.get() {
        log::set_max_level(config.level.filter());
        logger.configure(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    fn record<'a>(level: Level, args: std::fmt::Arguments<'a>) -> Record<'a> {
        Record::builder().level(level).args(args).build()
    }

    fn fatal<'a>(args: std::fmt::Arguments<'a>) -> Record<'a> {
        Record::builder()
            .level(Level::Error)
            .target(FATAL_TARGET)
            .args(args)
            .build()
    }

    #[test]
    fn formats_prefix_and_level() {
        let (logger, _rx) = ChannelLogger::with_receiver(LoggerConfig {
            level: LogLevel::System,
            show_level: true,
            prefix: Some("My Plugin".into()),
        });
        assert_eq!(
            logger.format(Level::Warn, "careful"),
            "[My Plugin] [WARN] careful"
        );
    }

    #[test]
    fn formats_bare_message() {
        let (logger, _rx) = ChannelLogger::with_receiver(LoggerConfig {
            level: LogLevel::System,
            show_level: false,
            prefix: None,
        });
        assert_eq!(logger.format(Level::Info, "hello"), "hello");
    }

    #[test]
    fn filters_below_level() {
        // Given
        let (logger, rx) = ChannelLogger::with_receiver(LoggerConfig {
            level: LogLevel::Warning,
            ..LoggerConfig::default()
        });

        // When
        logger.log(&record(Level::Info, format_args!("dropped")));
        logger.log(&record(Level::Warn, format_args!("kept")));
        logger.log(&record(Level::Error, format_args!("kept too")));

        // Then
        let lines: Vec<_> = rx.try_iter().map(|m| m.message).collect();
        assert_eq!(lines, vec!["[WARN] kept", "[ERR] kept too"]);
    }

    #[test]
    fn silent_drops_everything() {
        let (logger, rx) = ChannelLogger::with_receiver(LoggerConfig {
            level: LogLevel::Silent,
            ..LoggerConfig::default()
        });
        logger.log(&record(Level::Error, format_args!("nope")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reconfigure_at_runtime() {
        let (logger, rx) = ChannelLogger::with_receiver(LoggerConfig::default());
        logger.log(&record(Level::Trace, format_args!("hidden")));

        logger.configure(LoggerConfig {
            level: LogLevel::System,
            show_level: true,
            prefix: None,
        });
        logger.log(&record(Level::Trace, format_args!("visible")));

        let lines: Vec<_> = rx.try_iter().map(|m| m.message).collect();
        assert_eq!(lines, vec!["[SYS] visible"]);
    }

    #[test]
    fn fatal_level_keeps_only_fatal_records() {
        // Given
        let (logger, rx) = ChannelLogger::with_receiver(LoggerConfig {
            level: LogLevel::Fatal,
            ..LoggerConfig::default()
        });

        // When
        logger.log(&record(Level::Warn, format_args!("warning")));
        logger.log(&record(Level::Error, format_args!("plain error")));
        logger.log(&fatal(format_args!("cannot continue")));

        // Then
        let lines: Vec<_> = rx.try_iter().map(|m| m.message).collect();
        assert_eq!(lines, vec!["[FATAL] cannot continue"]);
    }

    #[test]
    fn error_level_keeps_errors_and_fatal_records() {
        let (logger, rx) = ChannelLogger::with_receiver(LoggerConfig {
            level: LogLevel::Error,
            ..LoggerConfig::default()
        });

        logger.log(&record(Level::Warn, format_args!("warning")));
        logger.log(&record(Level::Error, format_args!("plain error")));
        logger.log(&fatal(format_args!("cannot continue")));

        let lines: Vec<_> = rx.try_iter().map(|m| m.message).collect();
        assert_eq!(lines, vec!["[ERR] plain error", "[FATAL] cannot continue"]);
    }

    #[test]
    fn silent_drops_fatal_records() {
        let (logger, rx) = ChannelLogger::with_receiver(LoggerConfig {
            level: LogLevel::Silent,
            ..LoggerConfig::default()
        });
        logger.log(&fatal(format_args!("nope")));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn level_ordering_matches_filters() {
        assert!(LogLevel::System.filter() > LogLevel::Warning.filter());
        assert_eq!(LogLevel::Fatal.filter(), LevelFilter::Error);
        assert_eq!(LogLevel::Silent.filter(), LevelFilter::Off);
    }
}
