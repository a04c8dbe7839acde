//! Reactive Core
//!
//! This module turns plain object and array graphs into observable state.
//! Reads of reactive slots are tracked; writes notify the computations that
//! read them.
//!
//! # Concepts
//!
//! ## Deps
//!
//! A [`Dep`] is the notification channel of one reactive slot. Every
//! intercepted property has one, and every [`Observer`] has one for
//! structural changes of its container.
//!
//! ## Subscribers and the Target Stack
//!
//! A [`Subscriber`] is any computation that can depend on Deps. While it
//! evaluates, it sits on top of the [`Runtime`]'s target stack; every slot
//! it reads hands it the slot's Dep.
//!
//! ## Observers
//!
//! [`Runtime::observe`] attaches an Observer to a plain object or array,
//! converting object keys into reactive properties and observing nested
//! values. Arrays are not intercepted per index; their mutating methods
//! notify instead.
//!
//! ## Dynamic Membership
//!
//! [`Runtime::set`] and [`Runtime::del`] add and remove keys on observed
//! state while keeping it reactive.
//!
//! # Implementation Notes
//!
//! Everything is single-threaded and synchronous: `notify` runs every
//! subscriber's `update` to completion before returning, and a failing
//! update aborts the rest of the cycle.

mod array;
mod context;
mod dep;
mod mutate;
mod observer;
mod property;
mod runtime;
mod subscriber;
mod traverse;
mod watcher;

#[cfg(test)]
mod probe;

pub use context::TargetGuard;
pub use dep::{Dep, DepId};
pub use observer::Observer;
pub use property::{ReactiveOptions, ReactiveProperty};
pub use runtime::Runtime;
pub use subscriber::{Subscriber, SubscriberId};
pub use traverse::traverse;
pub use watcher::{Watcher, WatcherOptions};
