//! Watchtree Core
//!
//! This crate turns plain in-memory data (objects, arrays, and nested
//! graphs of them) into observed data that notifies interested consumers
//! whenever a part they read is mutated. Consumers never poll and never
//! re-register by hand: dependencies are discovered while they evaluate.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: dependencies, the active-reader context, subscribers and
//!   the bundled `Watcher`
//! - `observer`: per-container observers, reactive object slots, the
//!   array mutators, and the dynamic `set`/`del` API
//! - `value`: the dynamic `Value` type held by containers
//! - `config` / `diagnostics`: engine switches and misuse reporting
//!
//! Deciding *when* notified consumers re-run, diffing what they produce,
//! and caching retained instances are left to surrounding code.
//!
//! # Example
//!
//! ```rust,ignore
//! use watchtree_core::{observe, Value, Watcher};
//!
//! let root = Value::from(serde_json::json!({ "a": 1 }));
//! observe(&root, true);
//!
//! let object = root.as_object().unwrap().clone();
//! let watcher = Watcher::new(move || object.get("a"));
//!
//! root.as_object().unwrap().assign("a", Value::from(2));
//! // watcher re-ran synchronously and now holds 2
//! ```

pub mod config;
pub mod diagnostics;
pub mod observer;
pub mod reactive;
pub mod value;

pub use config::{Config, ConfigError};
pub use diagnostics::Diagnostic;
pub use observer::{
    define_reactive, del, observe, set, should_observe, toggle_observing, DefineOptions,
    Observer, ReactiveArray, ReactiveObject,
};
pub use reactive::{Dep, ReactiveContext, Subscriber, SubscriberId, Watcher, WatcherOptions};
pub use value::{OpaqueValue, PropKey, Value};
