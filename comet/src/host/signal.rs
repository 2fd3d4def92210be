//! Host signals and their connections.
//!
//! A [`Signal`] is the primitive a host uses to publish events such as "a frame was rendered" or
//! "the plugin is unloading". Connecting a callback returns a [`Connection`] that can later be
//! disconnected, typically by handing it to the [`Tracker`](crate::core::Tracker).
//!
//! # Example
//!
//! ```rust,ignore
//! let frames = Signal::<f64>::new();
//! let connection = frames.connect(|dt| println!("frame took {dt}s"));
//!
//! frames.fire(0.016);
//! connection.disconnect();
//! frames.fire(0.016); // no longer observed
//! ```

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError, Weak},
};

type Slot<A> = Arc<dyn Fn(A) + Send + Sync>;

struct Entry<A> {
    id: u64,
    once: bool,
    slot: Slot<A>,
}

struct Slots<A> {
    next_id: u64,
    entries: Vec<Entry<A>>,
}

/// Type-erased removal so a [`Connection`] does not carry the signal's argument type.
trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
    fn is_attached(&self, id: u64) -> bool;
}

impl<A: 'static> Detach for Mutex<Slots<A>> {
    fn detach(&self, id: u64) -> bool {
        let mut slots = self.lock().unwrap_or_else(PoisonError::into_inner);
        let before = slots.entries.len();
        slots.entries.retain(|entry| entry.id != id);
        slots.entries.len() != before
    }

    fn is_attached(&self, id: u64) -> bool {
        let slots = self.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entries.iter().any(|entry| entry.id == id)
    }
}

/// A multicast event published by the host.
pub struct Signal<A> {
    slots: Arc<Mutex<Slots<A>>>,
}

impl<A: Clone + 'static> Signal<A> {
    /// Create a signal with no connections.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Connect a callback invoked on every [`fire`](Self::fire).
    pub fn connect<F>(&self, slot: F) -> Connection
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        self.attach(Arc::new(slot), false)
    }

    /// Connect a callback invoked on the next [`fire`](Self::fire) only.
    ///
    /// The slot is removed before it runs, so it fires at most once even if the signal is fired
    /// again from inside the callback or from another thread.
    pub fn connect_once<F>(&self, slot: F) -> Connection
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        self.attach(Arc::new(slot), true)
    }

    fn attach(&self, slot: Slot<A>, once: bool) -> Connection {
        let mut slots = self.lock();
        let id = slots.next_id;
        slots.next_id += 1;
        slots.entries.push(Entry { id, once, slot });
        drop(slots);

        let detach: Weak<dyn Detach> = Arc::downgrade(&self.slots) as Weak<dyn Detach>;
        Connection { id, signal: detach }
    }

    /// Invoke every connected callback in connection order.
    ///
    /// Callbacks run outside the signal's lock, so they may connect or disconnect freely. A slot
    /// disconnected by an earlier callback of the same fire is not invoked. Slots connected
    /// during a fire first run on the next one.
    pub fn fire(&self, args: A) {
        let snapshot: Vec<(u64, bool, Slot<A>)> = {
            let mut slots = self.lock();
            let snapshot = slots
                .entries
                .iter()
                .map(|entry| (entry.id, entry.once, Arc::clone(&entry.slot)))
                .collect();
            slots.entries.retain(|entry| !entry.once);
            snapshot
        };

        for (id, once, slot) in snapshot {
            // Once slots were detached above, so only the others can have been disconnected.
            if !once && !self.slots.is_attached(id) {
                continue;
            }
            slot(args.clone());
        }
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if nothing is connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots<A>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: Clone + 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal").finish_non_exhaustive()
    }
}

/// A live subscription to a [`Signal`].
///
/// Dropping a connection does not disconnect it; call [`disconnect`](Self::disconnect) or track
/// it.
pub struct Connection {
    id: u64,
    signal: Weak<dyn Detach>,
}

impl Connection {
    /// Remove the callback from its signal. Safe to call more than once, and after the signal
    /// itself was dropped.
    pub fn disconnect(&self) {
        if let Some(signal) = self.signal.upgrade() {
            signal.detach(self.id);
        }
    }

    /// Returns `true` while the callback is still attached.
    pub fn is_connected(&self) -> bool {
        self.signal
            .upgrade()
            .is_some_and(|signal| signal.is_attached(self.id))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}
