//! Runtime configuration.
//!
//! A `ReactiveConfig` is owned by each [`Runtime`](crate::reactive::Runtime).
//! Every field has a default, so a partial JSON document is a valid config.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Switches that change how the reactivity core behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveConfig {
    /// Suppress usage diagnostics and the `on_change` hook of reactive
    /// properties.
    pub production: bool,

    /// When false, notifications are delivered synchronously and every
    /// `Dep::notify` sorts its subscribers by creation id so parents run
    /// before children. When true, ordering is left to the scheduler that
    /// consumes the notifications.
    pub async_mode: bool,

    /// Server-rendered state is written once and never mutated, so no new
    /// Observers are created while this is set.
    pub server_rendering: bool,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            production: false,
            async_mode: true,
            server_rendering: false,
        }
    }
}

impl ReactiveConfig {
    /// Configuration with synchronous, id-ordered notification.
    pub fn synchronous() -> Self {
        Self {
            async_mode: false,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Whether development diagnostics should be emitted.
    pub fn diagnostics_enabled(&self) -> bool {
        !self.production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_development_async_mode() {
        let config = ReactiveConfig::default();
        assert!(!config.production);
        assert!(config.async_mode);
        assert!(!config.server_rendering);
        assert!(config.diagnostics_enabled());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = ReactiveConfig::from_json_str(r#"{ "async_mode": false }"#).unwrap();
        assert_eq!(config, ReactiveConfig::synchronous());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = ReactiveConfig::from_json_str("{ production: ").unwrap_err();
        assert!(matches!(err, crate::ReactiveError::Config(_)));
    }
}
