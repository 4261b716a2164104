//! Simulator and rollout configuration, loaded from JSON.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Complete configuration for the simulator and its rollout driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub env: EnvSettings,
    pub rollout: RolloutSettings,
}

/// Environment bookkeeping limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvSettings {
    /// Number of finished-episode summaries kept in history (default: 100).
    pub history_capacity: usize,
    /// Finished episodes kept addressable in the store before the oldest is
    /// evicted (default: 32).
    pub max_finished_retained: usize,
    /// Invalid actions that end an episode (default: 5).
    pub max_invalid_actions: u32,
    /// Longest accepted message body, in characters (default: 500).
    pub max_message_len: usize,
    /// Messages of the current channel included in an observation (default: 10).
    pub recent_messages: usize,
    /// Seed for task selection. `None` seeds from system entropy.
    pub seed: Option<u64>,
}

/// Rollout driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutSettings {
    /// Episodes per `run` invocation (default: 5).
    pub episodes: usize,
    /// Hard cap on steps per collected episode (default: 100).
    pub step_cap: usize,
    /// Steps between check-in messages of the rule-based policy (default: 5).
    pub check_in_interval: usize,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            max_finished_retained: 32,
            max_invalid_actions: 5,
            max_message_len: 500,
            recent_messages: 10,
            seed: None,
        }
    }
}

impl Default for RolloutSettings {
    fn default() -> Self {
        Self {
            episodes: 5,
            step_cap: 100,
            check_in_interval: 5,
        }
    }
}

impl SimConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid simulator configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_limits() {
        let config = SimConfig::default();
        assert_eq!(config.env.max_invalid_actions, 5);
        assert_eq!(config.env.max_message_len, 500);
        assert_eq!(config.env.recent_messages, 10);
        assert!(config.env.seed.is_none());
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config = SimConfig::from_json(r#"{"env": {"seed": 7, "history_capacity": 3}}"#).unwrap();
        assert_eq!(config.env.seed, Some(7));
        assert_eq!(config.env.history_capacity, 3);
        assert_eq!(config.env.max_finished_retained, 32);
        assert_eq!(config.rollout.step_cap, 100);
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(SimConfig::from_json("{\"env\": 12}").is_err());
    }
}
