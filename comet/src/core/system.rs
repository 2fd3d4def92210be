//! Systems and their lifecycle hooks.
//!
//! A system is a unit of plugin logic. It is constructed once per app (eagerly when declared, or
//! lazily the first time another system resolves it) and afterwards only ever reached through a
//! [`SystemRef`].
//!
//! # Hooks
//!
//! | Hook            | Trait            | When                                              |
//! |-----------------|------------------|---------------------------------------------------|
//! | `on_init`       | [`OnInit`]       | Once during launch, dependencies first            |
//! | `on_start`      | [`OnStart`]      | Once after every system initialized, not awaited  |
//! | `on_render`     | [`OnRender`]     | Every rendered frame                              |
//! | `on_heartbeat`  | [`OnHeartbeat`]  | Every fixed-interval host tick                    |
//! | `on_end`        | [`OnEnd`]        | Once when the host unloads the plugin             |
//!
//! A system opts into hooks through its [`Lifecycle`] impl, normally derived:
//!
//! ```rust,ignore
//! #[derive(Lifecycle)]
//! #[lifecycle(init, heartbeat)]
//! struct Autosave { .. }
//!
//! impl OnInit for Autosave { .. }
//! impl OnHeartbeat for Autosave { .. }
//! ```

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError},
    time::{Duration, Instant},
};

use crate::core::{capability::Capabilities, registry::Dependencies, tasks::CancelToken};

/// Called synchronously when the app launches.
pub trait OnInit {
    /// Initialize the system. Every system this one resolved has already been initialized.
    fn on_init(&mut self);
}

/// Called once after every system has been initialized.
///
/// The driver does not wait for `on_start` to return: it runs on a worker thread and may overlap
/// with other systems' `on_start` and with frame callbacks. Errors are logged, never propagated.
///
/// The hook receives the system's handle instead of `&mut self` and no lock is held while it
/// runs. Lock the handle only around the state you touch so frame hooks keep running. A hook
/// that loops or waits must poll `cancel` and return once it is cancelled, which happens when
/// the plugin unloads.
///
/// ```rust,ignore
/// impl OnStart for Downloader {
///     fn on_start(this: SystemRef<Self>, cancel: CancelToken) -> anyhow::Result<()> {
///         while !cancel.is_cancelled() {
///             let chunk = fetch_next()?;
///             this.lock().received.push(chunk);
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait OnStart: Sized {
    /// Start the system.
    fn on_start(this: SystemRef<Self>, cancel: CancelToken) -> anyhow::Result<()>;
}

/// Called on every rendered frame of the host.
pub trait OnRender {
    /// `delta` is the time since the previous frame, in seconds.
    fn on_render(&mut self, delta: f64);
}

/// Called on the host's fixed-interval heartbeat.
pub trait OnHeartbeat {
    /// `delta` is the heartbeat interval, in seconds.
    fn on_heartbeat(&mut self, delta: f64);
}

/// Called when the host unloads the plugin.
pub trait OnEnd {
    /// Tear the system down. Frame callbacks have already been disconnected.
    fn on_end(&mut self);
}

/// Object-safe view of a system used by the driver.
///
/// `capabilities` reports which hooks the system implements, and each `as_*` accessor returns the
/// hook when implemented. `on_start` does not borrow the system, so it is reached through
/// [`run_start`](Self::run_start) on the concrete type instead. Prefer `#[derive(Lifecycle)]`,
/// which keeps all of them in sync.
pub trait Lifecycle: Send + 'static {
    /// The hooks this system implements.
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    fn as_on_init(&mut self) -> Option<&mut dyn OnInit> {
        None
    }

    /// Run the [`OnStart`] hook of a system of this type.
    fn run_start(this: SystemRef<Self>, cancel: CancelToken) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        let _ = (this, cancel);
        Ok(())
    }

    fn as_on_render(&mut self) -> Option<&mut dyn OnRender> {
        None
    }

    fn as_on_heartbeat(&mut self) -> Option<&mut dyn OnHeartbeat> {
        None
    }

    fn as_on_end(&mut self) -> Option<&mut dyn OnEnd> {
        None
    }
}

/// A system type that the registry knows how to construct.
pub trait System: Lifecycle + Sized {
    /// Construct the system.
    ///
    /// This is the only place where other systems may be resolved, through
    /// [`Dependencies::resolve`].
    fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self>;
}

/// Declaration options for a system.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SystemConfig {
    /// Do not construct the system unless another system depends on it.
    pub lazy: bool,
}

impl SystemConfig {
    /// Configuration for a system constructed on first resolution.
    #[inline]
    pub const fn lazy() -> Self {
        Self { lazy: true }
    }
}

/// A system identifier. Ids are dense and assigned in declaration order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct a new system Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this system if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

const LOCK_POLL: Duration = Duration::from_millis(1);

/// A shared handle to a constructed system.
///
/// Handles are cheap to clone. Systems are guarded by a mutex because `on_start` runs on a worker
/// thread while frame callbacks run on the host's thread.
pub struct SystemRef<T: ?Sized> {
    name: &'static str,
    inner: Arc<Mutex<T>>,
}

impl<T: ?Sized> SystemRef<T> {
    pub(crate) fn new(name: &'static str, inner: Arc<Mutex<T>>) -> Self {
        Self { name, inner }
    }

    /// The name the system was declared under.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Lock the system for access. A poisoned lock is recovered rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the system only if nobody else holds it.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Keep trying to lock the system until `timeout` elapses.
    pub fn lock_timeout(&self, timeout: Duration) -> Option<MutexGuard<'_, T>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_lock() {
                return Some(guard);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(LOCK_POLL);
        }
    }

    /// Returns `true` if both handles point to the same system instance.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: ?Sized> Clone for SystemRef<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> fmt::Debug for SystemRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRef").field("name", &self.name).finish()
    }
}
