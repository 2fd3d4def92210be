use std::{sync::Arc, time::Duration};

use anyhow::Context;
use comet::{
    Lifecycle,
    core::{
        App, AppConfig, CancelToken, Dependencies, LaunchOutcome, LogLevel, LoggerConfig, OnEnd,
        OnHeartbeat, OnInit, OnRender, OnStart, Store, System, SystemConfig, SystemRef, logger,
    },
    host::HeadlessHost,
    systems::Meta,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Stats {
    sessions: u32,
    frames: u64,
}

/// Counts rendered frames.
#[derive(Lifecycle)]
#[lifecycle(render)]
struct FrameCounter {
    frames: u64,
}

impl System for FrameCounter {
    fn new(_: &mut Dependencies<'_>) -> anyhow::Result<Self> {
        Ok(Self { frames: 0 })
    }
}

impl OnRender for FrameCounter {
    fn on_render(&mut self, _delta: f64) {
        self.frames += 1;
    }
}

/// Persists stats on every heartbeat.
#[derive(Lifecycle)]
#[lifecycle(init, heartbeat, end)]
struct Autosave {
    counter: SystemRef<FrameCounter>,
    store: Store<Stats>,
}

impl System for Autosave {
    fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
        let counter = deps.resolve::<FrameCounter>()?;
        let meta = deps.resolve::<Meta>()?;
        let store = Store::open(Arc::clone(meta.lock().plugin()), Stats::default())?;
        Ok(Self { counter, store })
    }
}

impl OnInit for Autosave {
    fn on_init(&mut self) {
        self.store.state_mut().sessions += 1;
        log::info!("Session #{}", self.store.state().sessions);
    }
}

impl OnHeartbeat for Autosave {
    fn on_heartbeat(&mut self, _delta: f64) {
        self.store.state_mut().frames = self.counter.lock().frames;
        if let Err(err) = self.store.force_save() {
            log::error!("Autosave failed: {err}");
        }
    }
}

impl OnEnd for Autosave {
    fn on_end(&mut self) {
        log::info!("Saved {} frames", self.store.state().frames);
        if let Err(err) = self.store.close() {
            log::error!("Closing the store failed: {err}");
        }
    }
}

/// Says hello once everything is up.
#[derive(Lifecycle)]
#[lifecycle(init, start)]
struct Greeter {
    meta: SystemRef<Meta>,
}

impl System for Greeter {
    fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            meta: deps.resolve::<Meta>()?,
        })
    }
}

impl OnInit for Greeter {
    fn on_init(&mut self) {
        log::debug!("Greeter ready");
    }
}

impl OnStart for Greeter {
    fn on_start(this: SystemRef<Self>, cancel: CancelToken) -> anyhow::Result<()> {
        if cancel.is_cancelled() {
            return Ok(());
        }
        let greeter = this.lock();
        log::info!("Hello from {}", greeter.meta.lock().app_name());
        Ok(())
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("invalid config {path}"))
        }
        None => Ok(AppConfig {
            log_level: LogLevel::Verbose,
            show_plugin_name: true,
            ..AppConfig::default()
        }),
    }
}

fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    let logs = logger::install(LoggerConfig {
        level: config.log_level,
        show_level: config.show_level,
        prefix: None,
    })
    .map_err(|err| anyhow::anyhow!("failed to install logger: {err}"))?;

    let host = Arc::new(HeadlessHost::new());
    let app = App::with_config(config);
    app.create_app("Comet Demo", host.clone(), false)?;
    app.declare::<FrameCounter>(SystemConfig::lazy())?;
    app.declare::<Autosave>(SystemConfig::default())?;
    app.declare::<Greeter>(SystemConfig::default())?;

    let outcome = app
        .launch()
        .inspect_err(|err| comet::fatal!("Launch failed: {err}"))?;
    match outcome {
        LaunchOutcome::Launched(report) => log::info!(
            "Launched {} systems ({} dependencies)",
            report.systems,
            report.dependencies
        ),
        LaunchOutcome::SkippedInPlayMode => log::warn!("Host is running, nothing launched"),
    }

    for _ in 0..120 {
        host.step(Duration::from_millis(16));
    }
    host.unload();
    drop(app);

    for line in logs.try_iter() {
        println!("{}", line.message);
    }
    Ok(())
}
