//! The capability guard.
//!
//! Systems implement any subset of the five lifecycle hooks. Which subset is declared once per
//! type (usually through `#[derive(Lifecycle)]`) and reported by
//! [`Lifecycle::capabilities`](crate::core::Lifecycle::capabilities). The driver asks
//! [`implements`] before invoking a hook, so a system is never called for a hook it did not
//! declare.

use std::fmt;

use bitflags::bitflags;

use crate::core::system::Lifecycle;

bitflags! {
    /// The set of lifecycle hooks a system implements.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const INIT = 1 << 0;
        const START = 1 << 1;
        const RENDER = 1 << 2;
        const HEARTBEAT = 1 << 3;
        const END = 1 << 4;
    }
}

/// A single lifecycle hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Synchronous initialization, run once during launch.
    Init,
    /// Fire-and-forget start, run after every system initialized.
    Start,
    /// Per-frame render callback.
    Render,
    /// Fixed-interval heartbeat callback.
    Heartbeat,
    /// Teardown, run once when the host unloads the plugin.
    End,
}

impl Capability {
    /// All hooks in the order the driver visits them.
    pub const ALL: [Capability; 5] = [
        Capability::Init,
        Capability::Start,
        Capability::Render,
        Capability::Heartbeat,
        Capability::End,
    ];

    /// The flag representing this hook inside a [`Capabilities`] set.
    #[inline]
    pub const fn flag(self) -> Capabilities {
        match self {
            Capability::Init => Capabilities::INIT,
            Capability::Start => Capabilities::START,
            Capability::Render => Capabilities::RENDER,
            Capability::Heartbeat => Capabilities::HEARTBEAT,
            Capability::End => Capabilities::END,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Init => write!(f, "on_init"),
            Capability::Start => write!(f, "on_start"),
            Capability::Render => write!(f, "on_render"),
            Capability::Heartbeat => write!(f, "on_heartbeat"),
            Capability::End => write!(f, "on_end"),
        }
    }
}

/// Returns `true` if `system` declares the given hook.
///
/// This is a pure query over the declared capability set; it never invokes the system.
#[inline]
pub fn implements(system: &dyn Lifecycle, capability: Capability) -> bool {
    system.capabilities().contains(capability.flag())
}
