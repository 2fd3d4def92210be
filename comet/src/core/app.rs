//! The lifecycle driver.
//!
//! An [`App`] moves through the phases of [`Phase`]:
//!
//! 1. `create_app` binds the host, declares the built-in systems and arms the shutdown handler
//!    on the host's `unloading` signal.
//! 2. Systems are declared. Eager ones are constructed immediately.
//! 3. `launch` initializes every constructed system (recorded dependencies first, then
//!    construction order), then spawns `on_start` hooks and connects `on_render` and
//!    `on_heartbeat` to the host's signals. Every task and connection goes to the tracker.
//! 4. When the host unloads the plugin the tracker is drained, which cancels running `on_start`
//!    hooks, and `on_end` runs on every system. A system still locked after
//!    [`END_LOCK_TIMEOUT`] is skipped.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    core::{
        capability::{Capability, implements},
        config::AppConfig,
        error::{Error, Result},
        logger::{self, LogLevel, LoggerConfig},
        paths::Node,
        registry::{Registry, Starter},
        state::{AppState, Phase},
        store::Store,
        system::{Id, Lifecycle, System, SystemConfig, SystemRef},
        tasks::{Executor, TaskHandle, panic_message},
        tracker::Trackable,
    },
    host::Host,
    systems::Meta,
};

/// How long unloading waits for a system's lock before skipping its `on_end`.
pub const END_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Summary of a successful launch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LaunchReport {
    /// Systems initialized.
    pub systems: usize,
    /// Dependency edges recorded during construction.
    pub dependencies: usize,
    /// `on_start` hooks spawned.
    pub started: usize,
    /// Render and heartbeat connections made.
    pub subscriptions: usize,
}

/// What [`App::launch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched(LaunchReport),
    /// The host is in play mode and the app was not enabled for it.
    SkippedInPlayMode,
}

struct Inner {
    phase: Phase,
    state: Option<Arc<AppState>>,
    registry: Registry,
}

impl Inner {
    fn state(&self) -> Result<&Arc<AppState>> {
        self.state.as_ref().ok_or(Error::AppNotCreated)
    }

    /// The state, if systems may still be declared or launched.
    fn open(&self) -> Result<Arc<AppState>> {
        match self.phase {
            Phase::Unconfigured => Err(Error::AppNotCreated),
            Phase::Created => self.state().cloned(),
            Phase::Launched => Err(Error::AlreadyLaunched),
            Phase::Unloaded => Err(Error::AppUnloaded),
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A plugin application.
pub struct App {
    inner: Arc<Mutex<Inner>>,
    executor: Executor,
    config: AppConfig,
}

impl App {
    /// An app with default configuration. Call [`create_app`](Self::create_app) next.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                phase: Phase::Unconfigured,
                state: None,
                registry: Registry::new(),
            })),
            executor: Executor::new(config.worker_threads),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock(&self.inner)
    }

    /// Bind the app to its host.
    ///
    /// Must be called exactly once, before anything else.
    pub fn create_app(
        &self,
        name: impl Into<String>,
        host: Arc<dyn Host>,
        enabled_in_play_mode: bool,
    ) -> Result<()> {
        let state = {
            let mut inner = self.lock();
            if inner.phase != Phase::Unconfigured {
                return Err(Error::CreatedAppTwice);
            }
            let state = Arc::new(AppState::new(name, host, enabled_in_play_mode));
            inner
                .registry
                .declare::<Meta>(&state, true, SystemConfig::default())?;
            inner.state = Some(Arc::clone(&state));
            inner.phase = Phase::Created;
            state
        };

        let inner = Arc::downgrade(&self.inner);
        state.host().unloading().connect_once(move |()| {
            if let Some(inner) = inner.upgrade() {
                shutdown(&inner);
            }
        });

        self.configure_logger(
            self.config.log_level,
            self.config.show_level,
            self.config.show_plugin_name,
        );
        log::trace!("Created app ({})", state.name());
        Ok(())
    }

    /// Declare a plugin system.
    pub fn declare<T: System>(&self, config: SystemConfig) -> Result<Id> {
        self.declare_as::<T>(false, config)
    }

    /// Declare an internal system: always lazy, and handed the [`AppState`] when constructed.
    pub fn declare_internal<T: System>(&self) -> Result<Id> {
        self.declare_as::<T>(true, SystemConfig::lazy())
    }

    fn declare_as<T: System>(&self, internal: bool, config: SystemConfig) -> Result<Id> {
        let mut inner = self.lock();
        let state = inner.open()?;
        inner.registry.declare::<T>(&state, internal, config)
    }

    /// Resolve a system as a dependency.
    ///
    /// Resolution is only valid from inside a system constructor, through
    /// [`Dependencies::resolve`](crate::core::Dependencies::resolve). Called on the app it
    /// always fails with [`Error::DependencyOutsideConstructor`] once the app exists.
    pub fn resolve<T: System>(&self) -> Result<SystemRef<T>> {
        let mut inner = self.lock();
        let state = Arc::clone(inner.state()?);
        inner.registry.resolve::<T>(&state)
    }

    /// A handle to a constructed system, for host-side code.
    pub fn system<T: System>(&self) -> Option<SystemRef<T>> {
        self.lock().registry.get::<T>()
    }

    /// Hand `object` to the tracker, disposing it when the plugin unloads.
    pub fn track(&self, object: impl Into<Trackable>) -> Result<()> {
        let inner = self.lock();
        if inner.phase == Phase::Unloaded {
            return Err(Error::AppUnloaded);
        }
        inner.state()?.tracker().handle(object);
        Ok(())
    }

    /// The host's plugin handle.
    pub fn plugin(&self) -> Result<Arc<dyn Host>> {
        Ok(Arc::clone(self.lock().state()?.host()))
    }

    /// The shared app state.
    pub fn state(&self) -> Result<Arc<AppState>> {
        self.lock().state().cloned()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Load every module in `path`, or in all of its descendants when `recursive`.
    ///
    /// Returns the number of modules loaded, which is zero when the host is in play mode and the
    /// app was not enabled for it.
    pub fn add_paths(&self, path: Option<&Node>, recursive: bool) -> Result<usize> {
        let state = self.state()?;
        if state.should_skip() {
            return Ok(0);
        }
        let Some(folder @ Node::Folder { .. }) = path else {
            return Err(Error::InvalidPath);
        };

        let modules = folder.modules(recursive);
        for module in &modules {
            log::trace!("add_paths() located a system. ({})", module.name());
            module.load(self)?;
        }
        Ok(modules.len())
    }

    /// Reconfigure the global logger installed with [`logger::install`].
    ///
    /// With `show_plugin_name` lines are prefixed with the app name, once the app is created.
    pub fn configure_logger(&self, level: LogLevel, show_level: bool, show_plugin_name: bool) {
        let prefix = if show_plugin_name {
            self.lock()
                .state
                .as_ref()
                .map(|state| state.name().to_string())
        } else {
            None
        };
        logger::configure(LoggerConfig {
            level,
            show_level,
            prefix,
        });
    }

    /// Open the plugin's settings-backed data store.
    pub fn datastore<T>(&self, default: T) -> Result<Store<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        Store::open(self.plugin()?, default)
    }

    /// Initialize every system, then start them and connect their frame hooks.
    pub fn launch(&self) -> Result<LaunchOutcome> {
        let mut inner = self.lock();
        let state = inner.open()?;
        if state.should_skip() {
            log::trace!("Host is running, skipped launch of ({})", state.name());
            return Ok(LaunchOutcome::SkippedInPlayMode);
        }

        let registry = &mut inner.registry;
        let pending: Vec<Id> = registry
            .edges()
            .iter()
            .map(|edge| edge.dependency)
            .chain(registry.constructed().iter().copied())
            .collect();

        let mut report = LaunchReport::default();
        for id in pending {
            let initialized = registry.initialize(id).inspect_err(|err| {
                crate::fatal!("Launch of ({}) aborted: {err}", state.name());
            })?;
            if initialized {
                report.systems += 1;
            }
        }
        report.dependencies = registry.edges().len();
        let systems: Vec<(SystemRef<dyn Lifecycle>, Option<Starter>)> = registry
            .constructed()
            .iter()
            .filter_map(|&id| Some((registry.lifecycle(id)?, registry.starter(id))))
            .collect();
        inner.phase = Phase::Launched;
        drop(inner);

        log::trace!(
            "Successfully launched {} systems. ({} Dependencies resolved)",
            report.systems,
            report.dependencies
        );

        let tracker = state.tracker();
        let host = state.host();
        for (system, starter) in systems {
            let (start, render, heartbeat) = {
                let guard = system.lock();
                (
                    implements(&*guard, Capability::Start),
                    implements(&*guard, Capability::Render),
                    implements(&*guard, Capability::Heartbeat),
                )
            };

            if let Some(starter) = starter.filter(|_| start) {
                tracker.handle(self.spawn_start(starter));
                report.started += 1;
            }
            if render {
                let hook = on_frame(system.clone(), |system, delta| {
                    if let Some(hook) = system.as_on_render() {
                        hook.on_render(delta);
                    }
                });
                tracker.handle(host.render_stepped().connect(hook));
                report.subscriptions += 1;
            }
            if heartbeat {
                let hook = on_frame(system.clone(), |system, delta| {
                    if let Some(hook) = system.as_on_heartbeat() {
                        hook.on_heartbeat(delta);
                    }
                });
                tracker.handle(host.heartbeat().connect(hook));
                report.subscriptions += 1;
            }
        }

        Ok(LaunchOutcome::Launched(report))
    }

    fn spawn_start(&self, starter: Starter) -> TaskHandle {
        self.executor.spawn(move |cancel| {
            let name = starter.name();
            let cancel = cancel.clone();
            match catch_unwind(AssertUnwindSafe(|| starter.run(cancel))) {
                Ok(Ok(())) => log::trace!("Started System ({name})"),
                Ok(Err(err)) => log::error!("System ({name}) failed to start: {err:#}"),
                Err(payload) => log::error!(
                    "System ({name}) panicked in on_start: {}",
                    panic_message(payload.as_ref())
                ),
            }
        })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a frame hook so a frame arriving while the system is locked elsewhere is skipped.
fn on_frame<F>(system: SystemRef<dyn Lifecycle>, hook: F) -> impl Fn(f64) + Send + Sync + 'static
where
    F: Fn(&mut dyn Lifecycle, f64) + Send + Sync + 'static,
{
    move |delta| match system.try_lock() {
        Some(mut guard) => hook(&mut *guard, delta),
        None => log::trace!("Skipped frame, System ({}) is busy", system.name()),
    }
}

/// Runs once, from the host's `unloading` signal.
fn shutdown(inner: &Mutex<Inner>) {
    let (state, systems) = {
        let mut inner = lock(inner);
        if inner.phase == Phase::Unloaded {
            return;
        }
        inner.phase = Phase::Unloaded;
        let Some(state) = inner.state.clone() else {
            return;
        };
        let systems: Vec<SystemRef<dyn Lifecycle>> = inner.registry.lifecycles().collect();
        (state, systems)
    };

    let disposed = state.tracker().clean();
    log::trace!("Unloading ({}), disposed {disposed} tracked objects", state.name());

    for system in systems {
        let Some(mut guard) = system.lock_timeout(END_LOCK_TIMEOUT) else {
            log::error!(
                "System ({}) is still busy after {END_LOCK_TIMEOUT:?}, skipped on_end",
                system.name()
            );
            continue;
        };
        if !implements(&*guard, Capability::End) {
            continue;
        }
        let Some(hook) = guard.as_on_end() else {
            continue;
        };
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| hook.on_end())) {
            log::error!(
                "System ({}) panicked in on_end: {}",
                system.name(),
                panic_message(payload.as_ref())
            );
        }
    }
}
