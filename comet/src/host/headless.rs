use std::{
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use serde_json::Value;

use crate::{
    core::time::FrameClock,
    host::{Host, Signal},
};

/// An in-process [`Host`] with no editor behind it.
///
/// Frames, heartbeats and unloading are triggered explicitly, which makes the host suitable for
/// tests and for running plugin logic from a command line.
///
/// ```rust,ignore
/// let host = Arc::new(HeadlessHost::new());
/// app.create_app("Demo", host.clone(), false)?;
/// app.launch()?;
///
/// for _ in 0..60 {
///     host.step(Duration::from_millis(16));
/// }
/// host.unload();
/// ```
pub struct HeadlessHost {
    running: AtomicBool,
    unloading: Signal<()>,
    render_stepped: Signal<f64>,
    heartbeat: Signal<f64>,
    settings: DashMap<String, Value>,
    clock: Mutex<FrameClock>,
}

impl HeadlessHost {
    /// A host in edit mode with a default heartbeat interval.
    pub fn new() -> Self {
        Self::with_clock(FrameClock::default())
    }

    /// A host whose [`step`](Self::step) uses the given clock.
    pub fn with_clock(clock: FrameClock) -> Self {
        Self {
            running: AtomicBool::new(false),
            unloading: Signal::new(),
            render_stepped: Signal::new(),
            heartbeat: Signal::new(),
            settings: DashMap::new(),
            clock: Mutex::new(clock),
        }
    }

    /// Enter or leave play mode.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Fire the unloading signal.
    pub fn unload(&self) {
        self.unloading.fire(());
    }

    /// Fire a single render frame.
    pub fn render(&self, delta: f64) {
        self.render_stepped.fire(delta);
    }

    /// Fire a single heartbeat.
    pub fn beat(&self, delta: f64) {
        self.heartbeat.fire(delta);
    }

    /// Advance one frame: fire every heartbeat that became due, then render.
    ///
    /// Returns the number of heartbeats fired.
    pub fn step(&self, delta: Duration) -> usize {
        let (steps, fixed) = {
            let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
            let steps = clock.advance(delta);
            (steps, clock.fixed_delta_secs())
        };

        for _ in 0..steps {
            self.beat(fixed);
        }
        self.render(delta.as_secs_f64());
        steps
    }

    /// Number of stored settings.
    pub fn settings_len(&self) -> usize {
        self.settings.len()
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for HeadlessHost {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn unloading(&self) -> &Signal<()> {
        &self.unloading
    }

    fn render_stepped(&self) -> &Signal<f64> {
        &self.render_stepped
    }

    fn heartbeat(&self) -> &Signal<f64> {
        &self.heartbeat
    }

    fn get_setting(&self, key: &str) -> Option<Value> {
        self.settings.get(key).map(|entry| entry.value().clone())
    }

    fn set_setting(&self, key: &str, value: Value) {
        self.settings.insert(key.to_string(), value);
    }
}
