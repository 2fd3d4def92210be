pub mod app;
pub mod capability;
pub mod config;
pub mod error;
pub mod logger;
pub mod paths;
pub mod registry;
pub mod state;
pub mod store;
pub mod system;
pub mod tasks;
pub mod time;
pub mod tracker;

pub use app::{App, LaunchOutcome, LaunchReport};
pub use capability::{Capabilities, Capability, implements};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use logger::{LogLevel, LoggerConfig};
pub use paths::{Module, Node};
pub use registry::{Dependencies, Edge, Registry, Starter};
pub use state::{AppState, Phase};
pub use store::Store;
pub use system::{
    Id, Lifecycle, OnEnd, OnHeartbeat, OnInit, OnRender, OnStart, System, SystemConfig, SystemRef,
};
pub use tasks::{CancelToken, Executor, TaskHandle};
pub use time::FrameClock;
pub use tracker::{Disposable, Trackable, Tracker};
