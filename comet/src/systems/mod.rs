//! Systems provided by Comet itself.
//!
//! These are declared internal by [`App::create_app`](crate::core::App::create_app), so they are
//! lazy and only constructed when a plugin system resolves them.

mod meta;

pub use meta::Meta;
