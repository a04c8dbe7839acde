//! Trellis Core
//!
//! This crate provides the dependency-tracking reactivity core of the
//! Trellis UI framework. It implements:
//!
//! - A dynamic value model of shared objects and arrays
//! - Observers that convert plain value graphs into reactive state
//! - Dependency channels and the active-subscriber stack
//! - Dynamic property addition and removal on observed state
//! - A reference watcher for driving the protocol end to end
//!
//! Rendering, component lifecycle and update scheduling consume the
//! notifications produced here but live outside this crate.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: Objects, arrays and primitive values
//! - `reactive`: Observers, Deps, the runtime and watchers
//! - `config`: Runtime configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use trellis_core::reactive::{Runtime, Watcher, WatcherOptions};
//! use trellis_core::value::{ObjectRef, Value};
//!
//! let runtime = Runtime::default();
//!
//! // Make some state reactive
//! let state = ObjectRef::from_entries([("count", Value::from(0))]);
//! runtime.observe(&Value::from(state.clone()), true);
//!
//! // Watch a derived value
//! let reader = state.clone();
//! let doubled = Watcher::new(
//!     &runtime,
//!     move |rt| Ok(Value::from(reader.get(rt, "count").as_number().unwrap_or(0.0) * 2.0)),
//!     WatcherOptions::default(),
//! )?;
//!
//! // Update the state
//! state.put(&runtime, "count", Value::from(5))?;
//! // Watcher re-ran synchronously
//! assert_eq!(doubled.value().as_number(), Some(10.0));
//! # Ok::<(), trellis_core::ReactiveError>(())
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod value;

pub use config::ReactiveConfig;
pub use error::{ReactiveError, Result};
