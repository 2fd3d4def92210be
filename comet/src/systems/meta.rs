use std::sync::Arc;

use crate::{
    Lifecycle,
    core::{AppState, Dependencies, Error, System},
    host::Host,
};

/// Access to plugin-level globals: the app name and the host's plugin handle.
///
/// ```rust,ignore
/// impl System for Titlebar {
///     fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
///         let meta = deps.resolve::<Meta>()?;
///         let title = meta.lock().app_name().to_string();
///         Ok(Self { title })
///     }
/// }
/// ```
#[derive(Lifecycle)]
pub struct Meta {
    state: Arc<AppState>,
}

impl Meta {
    /// The plugin handle of the host.
    pub fn plugin(&self) -> &Arc<dyn Host> {
        self.state.host()
    }

    /// The name given to `create_app`.
    pub fn app_name(&self) -> &str {
        self.state.name()
    }
}

impl System for Meta {
    fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
        let state = deps.state().ok_or(Error::InvalidSystem("Meta"))?;
        Ok(Self {
            state: Arc::clone(state),
        })
    }
}
