use std::{fmt, sync::Arc};

use crate::{core::tracker::Tracker, host::Host};

/// The phases an [`App`](crate::core::App) moves through. Transitions only go forward.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// `create_app` has not been called
    #[default]
    Unconfigured,
    /// The host is bound and systems may be declared
    Created,
    /// Every system has been initialized and frame hooks are connected
    Launched,
    /// The host unloaded the plugin
    Unloaded,
}

/// State shared by the app and every system constructed by it.
///
/// Internal systems receive it through [`Dependencies::state`](crate::core::Dependencies::state).
pub struct AppState {
    name: String,
    host: Arc<dyn Host>,
    tracker: Arc<Tracker>,
    run_in_play_mode: bool,
}

impl AppState {
    pub(crate) fn new(name: impl Into<String>, host: Arc<dyn Host>, run_in_play_mode: bool) -> Self {
        Self {
            name: name.into(),
            host,
            tracker: Arc::new(Tracker::new()),
            run_in_play_mode,
        }
    }

    /// The app name given to `create_app`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The plugin handle of the host.
    #[inline]
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// The tracker drained when the plugin unloads.
    #[inline]
    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    /// Returns `true` if the app should launch while the host is in play mode.
    #[inline]
    pub fn run_in_play_mode(&self) -> bool {
        self.run_in_play_mode
    }

    /// Returns `true` if the host is in play mode and the app was not enabled for it.
    pub fn should_skip(&self) -> bool {
        self.host.is_running() && !self.run_in_play_mode
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("name", &self.name)
            .field("run_in_play_mode", &self.run_in_play_mode)
            .field("tracked", &self.tracker.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHost;

    #[test]
    fn skips_only_when_running_without_play_mode() {
        // Given
        let host = Arc::new(HeadlessHost::new());
        let editor_only = AppState::new("Editor", host.clone(), false);
        let play_enabled = AppState::new("Play", host.clone(), true);

        // Then
        assert!(!editor_only.should_skip());

        // When
        host.set_running(true);

        // Then
        assert!(editor_only.should_skip());
        assert!(!play_enabled.should_skip());
    }

    #[test]
    fn phase_starts_unconfigured() {
        assert_eq!(Phase::default(), Phase::Unconfigured);
    }
}
