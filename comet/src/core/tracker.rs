//! The resource tracker.
//!
//! Anything handed to the [`Tracker`] is disposed exactly once when the plugin unloads, in the
//! order it was tracked. Registrants give up responsibility for disposing it themselves.
//!
//! ```rust,ignore
//! fn on_init(&mut self) {
//!     // Disconnected on unload.
//!     self.tracker.handle(host.heartbeat().connect(|dt| autosave(dt)));
//!     // Invoked on unload.
//!     self.tracker.handle(Trackable::callback(|| log::info!("bye")));
//! }
//! ```

use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Mutex, PoisonError},
};

use crate::{
    core::tasks::{TaskHandle, panic_message},
    host::Connection,
};

/// A resource that knows how to destroy itself.
pub trait Disposable: Send {
    /// Release the resource.
    fn destroy(&mut self);
}

/// Everything the tracker can dispose.
pub enum Trackable {
    /// A disposable resource; destroyed.
    Resource(Box<dyn Disposable>),
    /// A signal subscription; disconnected.
    Connection(Connection),
    /// A scheduled task; cancelled.
    Task(TaskHandle),
    /// A zero-argument cleanup callback; invoked.
    Callback(Box<dyn FnOnce() + Send>),
}

impl Trackable {
    /// Track a cleanup callback.
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Trackable::Callback(Box::new(f))
    }

    /// Track a disposable resource.
    pub fn resource<D>(resource: D) -> Self
    where
        D: Disposable + 'static,
    {
        Trackable::Resource(Box::new(resource))
    }

    fn kind(&self) -> &'static str {
        match self {
            Trackable::Resource(_) => "resource",
            Trackable::Connection(_) => "connection",
            Trackable::Task(_) => "task",
            Trackable::Callback(_) => "callback",
        }
    }

    fn dispose(self) {
        match self {
            Trackable::Resource(mut resource) => resource.destroy(),
            Trackable::Connection(connection) => connection.disconnect(),
            Trackable::Task(task) => task.cancel(),
            Trackable::Callback(callback) => callback(),
        }
    }
}

impl From<Connection> for Trackable {
    fn from(connection: Connection) -> Self {
        Trackable::Connection(connection)
    }
}

impl From<TaskHandle> for Trackable {
    fn from(task: TaskHandle) -> Self {
        Trackable::Task(task)
    }
}

impl From<Box<dyn Disposable>> for Trackable {
    fn from(resource: Box<dyn Disposable>) -> Self {
        Trackable::Resource(resource)
    }
}

impl fmt::Debug for Trackable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Trackable").field(&self.kind()).finish()
    }
}

/// An append-only disposal ledger.
#[derive(Default)]
pub struct Tracker {
    ledger: Mutex<Vec<Trackable>>,
}

impl Tracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object to the ledger.
    pub fn handle(&self, object: impl Into<Trackable>) {
        self.lock().push(object.into());
    }

    /// Dispose every tracked object in registration order and empty the ledger.
    ///
    /// A disposal that panics is logged and does not stop the remaining ones. Objects tracked
    /// while cleaning (for example by a cleanup callback) are kept for the next call. Returns
    /// how many objects were disposed without failure.
    pub fn clean(&self) -> usize {
        let ledger = std::mem::take(&mut *self.lock());
        let total = ledger.len();
        let mut disposed = 0;

        for object in ledger {
            let kind = object.kind();
            match catch_unwind(AssertUnwindSafe(|| object.dispose())) {
                Ok(()) => disposed += 1,
                Err(payload) => log::error!(
                    "failed to dispose tracked {kind}: {}",
                    panic_message(payload.as_ref())
                ),
            }
        }

        log::trace!("Tracker cleaned ({disposed}/{total} disposed)");
        disposed
    }

    /// Number of objects awaiting disposal.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing awaits disposal.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Trackable>> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker").field("len", &self.len()).finish()
    }
}
