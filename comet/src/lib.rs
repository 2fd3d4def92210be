//! Comet: lifecycle orchestration and dependency injection for host-driven plugins.
//!
//! A plugin declares its [`System`](crate::core::System)s on an [`App`](crate::core::App). Systems are
//! constructed eagerly at declaration time or lazily on first resolution, may resolve other
//! systems from inside their constructors, and receive the `init`, `start`, `render`,
//! `heartbeat` and `end` hooks they implement once the app is launched. Everything a system
//! hands to the [`Tracker`](crate::core::Tracker) is disposed when the host unloads the plugin.
//!
//! ```rust,ignore
//! use comet::core::{App, Dependencies, Lifecycle, OnInit, System, SystemConfig, SystemRef};
//!
//! #[derive(Lifecycle)]
//! struct Clock { ticks: u64 }
//!
//! impl System for Clock {
//!     fn new(_: &mut Dependencies<'_>) -> anyhow::Result<Self> {
//!         Ok(Self { ticks: 0 })
//!     }
//! }
//!
//! #[derive(Lifecycle)]
//! #[lifecycle(init)]
//! struct Greeter { clock: SystemRef<Clock> }
//!
//! impl System for Greeter {
//!     fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
//!         Ok(Self { clock: deps.resolve::<Clock>()? })
//!     }
//! }
//!
//! impl OnInit for Greeter {
//!     fn on_init(&mut self) {
//!         log::info!("hello at tick {}", self.clock.lock().ticks);
//!     }
//! }
//!
//! let app = App::new();
//! app.create_app("My Plugin", host, false)?;
//! app.declare::<Clock>(SystemConfig::lazy())?;
//! app.declare::<Greeter>(SystemConfig::default())?;
//! app.launch()?;
//! ```

// Allows `::comet::...` paths emitted by the derive macros to resolve inside this crate.
extern crate self as comet;

pub mod core;
pub mod host;
pub mod systems;

pub use comet_macros::Lifecycle;
pub use crate::core::{Error, Result};

// Used by the code `#[derive(Lifecycle)]` and `fatal!` generate.
#[doc(hidden)]
pub use anyhow;
#[doc(hidden)]
pub use log;
