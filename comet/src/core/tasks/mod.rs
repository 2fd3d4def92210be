//! Background work for fire-and-forget lifecycle hooks.

mod executor;

pub use executor::{CancelToken, Executor, TaskHandle};

use std::any::Any;

/// Best-effort text of a panic payload, for logging.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
