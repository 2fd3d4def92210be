//! The host side of a plugin session.
//!
//! Comet never talks to an editor directly. Everything it needs from the application that loads
//! the plugin goes through the [`Host`] trait: whether the host is in play mode, the signals that
//! drive frames and teardown, and key/value settings storage.

mod headless;
mod signal;

pub use headless::HeadlessHost;
pub use signal::{Connection, Signal};

use serde_json::Value;

/// The plugin handle provided by the host application.
pub trait Host: Send + Sync + 'static {
    /// Returns `true` while the host is running a play session.
    fn is_running(&self) -> bool;

    /// Fired once when the host unloads the plugin.
    fn unloading(&self) -> &Signal<()>;

    /// Fired every rendered frame with the frame delta in seconds.
    fn render_stepped(&self) -> &Signal<f64>;

    /// Fired on a fixed interval with the interval in seconds.
    fn heartbeat(&self) -> &Signal<f64>;

    /// Read a persisted setting.
    fn get_setting(&self, key: &str) -> Option<Value>;

    /// Persist a setting.
    fn set_setting(&self, key: &str, value: Value);
}
