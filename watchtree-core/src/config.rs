//! Runtime Configuration
//!
//! Knobs that change how the observation engine behaves: whether
//! diagnostics are emitted, whether notification order is left to an
//! external scheduler, and whether the engine is in the non-mutating
//! rendering mode where no new observers are created.
//!
//! # Scope
//!
//! The configuration is confined to the evaluating thread, like the
//! reactive context stack. Every thread starts from `Config::default()`.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Engine configuration.
///
/// Missing fields fall back to their defaults when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Suppress diagnostic logging. An installed warn handler still runs.
    pub silent: bool,

    /// Production mode: diagnostics are not produced at all.
    pub production: bool,

    /// Updates are batched by an external scheduler that orders them
    /// itself. When false, `Dep::notify` sorts subscribers by creation
    /// order before delivering.
    pub batched: bool,

    /// Non-mutating rendering mode. `observe` creates no observers while set.
    pub server_rendering: bool,
}

impl Config {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Run `f` with a reference to the active configuration.
pub fn with<R>(f: impl FnOnce(&Config) -> R) -> R {
    CONFIG.with(|config| f(&config.borrow()))
}

/// Snapshot of the active configuration.
pub fn current() -> Config {
    with(Config::clone)
}

/// Install a new configuration, returning the previous one.
pub fn replace(config: Config) -> Config {
    tracing::debug!(?config, "configuration replaced");
    CONFIG.with(|slot| slot.replace(config))
}

/// Modify the active configuration in place.
pub fn update(f: impl FnOnce(&mut Config)) {
    CONFIG.with(|config| f(&mut config.borrow_mut()));
}
