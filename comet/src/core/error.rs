//! Error types for Comet.
//!
//! Every variant except [`Error::Construction`] and [`Error::Settings`] is a contract violation:
//! the caller declared, resolved or launched something in the wrong order. They are raised at the
//! call site and never retried.

use thiserror::Error;

/// The main error type for Comet operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Attempted use of resolve() outside of a system's constructor.")]
    DependencyOutsideConstructor,

    #[error("System '{0}' attempted to depend on itself.")]
    SelfDependency(&'static str),

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<&'static str>),

    #[error("System '{0}' was not found.")]
    SystemNotFound(&'static str),

    #[error(
        "Attempted to add '{0}' as a dependency, but it isn't a valid system. Was it declared after the system depending on it?"
    )]
    InvalidSystem(&'static str),

    #[error("System '{0}' was declared more than once.")]
    DuplicateSystem(&'static str),

    #[error("App has not been created. Did you forget to call create_app()?")]
    AppNotCreated,

    #[error("You've attempted to call create_app() more than once!")]
    CreatedAppTwice,

    #[error("App has already been launched.")]
    AlreadyLaunched,

    #[error("App has already been unloaded.")]
    AppUnloaded,

    #[error("Path provided to add_paths() is not a container.")]
    InvalidPath,

    #[error("System '{system}' failed to construct: {source}")]
    Construction {
        system: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Result alias used throughout Comet.
pub type Result<T, E = Error> = std::result::Result<T, E>;
