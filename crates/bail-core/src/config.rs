//! Orchestrator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of a [`crate::SessionOrchestrator`]
///
/// ```toml
/// render_cache_capacity = 1000
/// render_cache_ttl_secs = 600
/// max_batch_ops = 200
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Maximum cached renders across all sessions
    pub render_cache_capacity: u64,
    /// Optional time-to-live of a cached render
    pub render_cache_ttl_secs: Option<u64>,
    /// Largest batch accepted by `apply_mutation_batch`
    pub max_batch_ops: usize,
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Returns the TOML error on syntax or unknown keys
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    #[inline]
    #[must_use]
    pub fn with_render_cache_capacity(mut self, capacity: u64) -> Self {
        self.render_cache_capacity = capacity;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_render_cache_ttl(mut self, ttl: Duration) -> Self {
        self.render_cache_ttl_secs = Some(ttl.as_secs());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_batch_ops(mut self, max: usize) -> Self {
        self.max_batch_ops = max;
        self
    }

    /// Render cache TTL, if any
    #[inline]
    #[must_use]
    pub fn render_cache_ttl(&self) -> Option<Duration> {
        self.render_cache_ttl_secs.map(Duration::from_secs)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            render_cache_capacity: 1_000,
            render_cache_ttl_secs: None,
            max_batch_ops: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = OrchestratorConfig::from_toml_str("max_batch_ops = 5\n").unwrap();
        assert_eq!(config.max_batch_ops, 5);
        assert_eq!(config.render_cache_capacity, 1_000);
        assert_eq!(config.render_cache_ttl(), None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(OrchestratorConfig::from_toml_str("max_ops = 5\n").is_err());
    }

    #[test]
    fn builders() {
        let config = OrchestratorConfig::new()
            .with_render_cache_capacity(10)
            .with_render_cache_ttl(Duration::from_secs(30))
            .with_max_batch_ops(3);
        assert_eq!(config.render_cache_capacity, 10);
        assert_eq!(config.render_cache_ttl(), Some(Duration::from_secs(30)));
        assert_eq!(config.max_batch_ops, 3);
    }
}
