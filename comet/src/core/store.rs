//! A settings-backed data store with session locking.
//!
//! The host may load the same plugin more than once (for example an editor with two open
//! places). Only the first session to open a [`Store`] owns the persisted data; later sessions
//! work on a copy of the defaults and never write back.

use std::{fmt, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    core::{error::Result, tracker::Disposable},
    host::Host,
};

/// Settings key of the persisted state.
pub const DATA_KEY: &str = "__COMET_DS";
/// Settings key of the session lock.
pub const LOCK_KEY: &str = "__COMET_SL";

/// Persistent plugin state of type `T`.
pub struct Store<T> {
    host: Arc<dyn Host>,
    state: T,
    owned: bool,
}

impl<T> Store<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open the store, taking the session lock if it is free.
    ///
    /// With the lock, previously persisted state replaces `default`, or `default` is persisted
    /// if there is none. Without it, `default` is used and nothing is ever written.
    pub fn open(host: Arc<dyn Host>, default: T) -> Result<Self> {
        let locked = host
            .get_setting(LOCK_KEY)
            .and_then(|value| value.as_bool())
            .unwrap_or(false);

        if locked {
            log::warn!("[DS] Existing session detected. Data will not be available.");
            return Ok(Self {
                host,
                state: default,
                owned: false,
            });
        }

        let state = match host.get_setting(DATA_KEY) {
            Some(persisted) => serde_json::from_value(persisted)?,
            None => {
                host.set_setting(DATA_KEY, serde_json::to_value(&default)?);
                default
            }
        };
        host.set_setting(LOCK_KEY, Value::Bool(true));

        Ok(Self {
            host,
            state,
            owned: true,
        })
    }

    /// Persist the current state now.
    pub fn force_save(&self) -> Result<()> {
        if self.owned {
            self.host
                .set_setting(DATA_KEY, serde_json::to_value(&self.state)?);
        }
        Ok(())
    }

    /// Persist the current state and release the session lock.
    ///
    /// Closing twice, or closing a store that never held the lock, does nothing.
    pub fn close(&mut self) -> Result<()> {
        if !self.owned {
            return Ok(());
        }
        self.force_save()?;
        self.host.set_setting(LOCK_KEY, Value::Bool(false));
        self.owned = false;
        Ok(())
    }
}

impl<T> Store<T> {
    pub fn state(&self) -> &T {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut T {
        &mut self.state
    }

    /// Returns `true` if this session holds the lock and its changes are persisted.
    pub fn is_owner(&self) -> bool {
        self.owned
    }
}

impl<T> Disposable for Store<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    fn destroy(&mut self) {
        if let Err(err) = self.close() {
            log::error!("[DS] Failed to save on close: {err}");
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("owned", &self.owned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{Error, Trackable, Tracker},
        host::HeadlessHost,
    };
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        opened: u32,
    }

    fn host() -> Arc<dyn Host> {
        Arc::new(HeadlessHost::new())
    }

    #[test]
    fn first_session_persists_defaults() {
        // Given
        let host = host();

        // When
        let store = Store::open(host.clone(), Prefs::default()).unwrap();

        // Then
        assert!(store.is_owner());
        assert_eq!(host.get_setting(LOCK_KEY), Some(json!(true)));
        assert_eq!(
            host.get_setting(DATA_KEY),
            Some(json!({ "theme": "", "opened": 0 }))
        );
    }

    #[test]
    fn persisted_state_replaces_defaults() {
        let host = host();
        host.set_setting(DATA_KEY, json!({ "theme": "dark", "opened": 3 }));

        let store = Store::open(host, Prefs::default()).unwrap();

        assert_eq!(store.state().theme, "dark");
        assert_eq!(store.state().opened, 3);
    }

    #[test]
    fn second_session_sees_defaults_and_never_writes() {
        // Given
        let host = host();
        let mut first = Store::open(host.clone(), Prefs::default()).unwrap();
        first.state_mut().opened = 1;
        first.force_save().unwrap();

        // When
        let mut second = Store::open(
            host.clone(),
            Prefs {
                theme: "light".into(),
                opened: 0,
            },
        )
        .unwrap();
        second.state_mut().opened = 99;
        second.close().unwrap();

        // Then
        assert!(!second.is_owner());
        assert_eq!(second.state().theme, "light");
        assert_eq!(
            host.get_setting(DATA_KEY),
            Some(json!({ "theme": "", "opened": 1 }))
        );
        assert_eq!(host.get_setting(LOCK_KEY), Some(json!(true)));
    }

    #[test]
    fn close_saves_and_releases_lock() {
        let host = host();
        let mut store = Store::open(host.clone(), Prefs::default()).unwrap();
        store.state_mut().theme = "dark".into();

        store.close().unwrap();
        store.close().unwrap();

        assert_eq!(host.get_setting(LOCK_KEY), Some(json!(false)));
        assert_eq!(
            host.get_setting(DATA_KEY),
            Some(json!({ "theme": "dark", "opened": 0 }))
        );
        assert!(Store::open(host, Prefs::default()).unwrap().is_owner());
    }

    #[test]
    fn malformed_persisted_state_is_a_settings_error() {
        let host = host();
        host.set_setting(DATA_KEY, json!("not an object"));

        let err = Store::open(host.clone(), Prefs::default()).unwrap_err();

        assert!(matches!(err, Error::Settings(_)));
        assert!(host.get_setting(LOCK_KEY).is_none());
    }

    #[test]
    fn tracked_store_closes_on_clean() {
        let host = host();
        let tracker = Tracker::new();
        let store = Store::open(host.clone(), Prefs::default()).unwrap();

        tracker.handle(Trackable::resource(store));
        tracker.clean();

        assert_eq!(host.get_setting(LOCK_KEY), Some(json!(false)));
    }
}
