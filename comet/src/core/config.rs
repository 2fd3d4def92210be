//! App configuration.

use serde::Deserialize;

use crate::core::logger::LogLevel;

/// Settings applied when an [`App`](crate::core::App) is built and created.
///
/// Every field has a default, so a partial document deserializes:
///
/// ```rust,ignore
/// let config: AppConfig = serde_json::from_str(r#"{ "log_level": "verbose" }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Worker threads running `on_start` hooks.
    pub worker_threads: usize,
    pub log_level: LogLevel,
    /// Show the level tag in log lines.
    pub show_level: bool,
    /// Prefix log lines with the app name.
    pub show_plugin_name: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            log_level: LogLevel::Fatal,
            show_level: true,
            show_plugin_name: false,
        }
    }
}
