//! Error types for the reactivity core.
//!
//! Usage mistakes that the core can recover from (adding a key to a root
//! state container, for example) are reported through `tracing` warnings
//! and never surface here. `ReactiveError` covers the failures that abort
//! an operation.

use thiserror::Error;

/// Errors raised by reactive operations.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// `set` or `del` was called on `undefined`, `null` or a primitive.
    #[error("cannot {op} reactive property on {kind} value")]
    InvalidTarget {
        op: &'static str,
        kind: &'static str,
    },

    /// The property exists but cannot be redefined or removed.
    #[error("property `{0}` is not configurable")]
    NonConfigurable(String),

    /// A new property was added to an object that no longer accepts them.
    #[error("cannot add property `{0}`: object is not extensible")]
    NotExtensible(String),

    /// Assignment to a read-only data property.
    #[error("cannot assign to read-only property `{0}`")]
    ReadOnly(String),

    /// The key is neither an index nor `length`.
    #[error("key `{0}` is not valid for an array")]
    InvalidArrayKey(String),

    /// A subscriber's update failed. Propagated unchanged out of `notify`.
    #[error("subscriber {id} failed: {message}")]
    Subscriber { id: u64, message: String },

    /// The value graph contains a cycle and cannot be serialized.
    #[error("cannot serialize a cyclic value")]
    Cyclic,

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;

impl ReactiveError {
    /// Build a subscriber failure from any displayable cause.
    pub fn subscriber(id: u64, cause: impl std::fmt::Display) -> Self {
        Self::Subscriber {
            id,
            message: cause.to_string(),
        }
    }
}
