//! Project configuration file support for roleplay.
//!
//! Loads configuration from `roleplay.toml` (or the file given with `--config`).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use roleplay_reward::models::Normalization;
use roleplay_reward::RewardFrameworkConfig;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "roleplay.toml";

const DEFAULT_SCORER_TIMEOUT_SECS: u64 = 30;

/// Project-level configuration loaded from `roleplay.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Per-provider request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Reward model configuration
    #[serde(default)]
    pub reward: RewardConfig,
    /// OpenRouter provider configuration
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

/// `[reward]` section
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RewardConfig {
    /// Weight per reward model name; omitted means the built-in defaults
    pub weights: Option<BTreeMap<String, f64>>,
    /// Phrases for the blacklist model (replaces the built-in list)
    pub blacklist: Option<Vec<String>>,
    /// HTTP scorers keyed by reward model name
    #[serde(default)]
    pub scorers: BTreeMap<String, ScorerConfig>,
}

/// `[reward.scorers.<name>]` section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScorerConfig {
    pub endpoint: String,
    #[serde(default)]
    pub normalization: Normalization,
    /// Task types the scorer applies to (default: all)
    pub task_types: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

impl ScorerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_SCORER_TIMEOUT_SECS))
    }
}

/// `[openrouter]` section
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OpenRouterConfig {
    pub model: Option<String>,
    /// Falls back to the `OPENROUTER_API_KEY` environment variable
    pub api_key: Option<String>,
}

impl ProjectConfig {
    /// Load configuration from `path`.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(config))
    }

    /// Validated reward weights.
    /// Priority: [reward.weights] > built-in defaults
    pub fn reward_weights(&self) -> Result<RewardFrameworkConfig> {
        match self.reward.weights {
            Some(ref weights) => RewardFrameworkConfig::from_named(weights)
                .context("Invalid [reward.weights] in configuration"),
            None => Ok(RewardFrameworkConfig::default()),
        }
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
