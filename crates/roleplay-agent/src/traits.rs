use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::CompletionOutput;

/// Errors that can occur while obtaining a completion
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to spawn provider process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Provider timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Provider configuration error: {0}")]
    ConfigError(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider execution failed: {0}")]
    ExecutionFailed(String),
}

/// A prompt plus the speaker names generation should stop at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub stop: Vec<String>,
    /// Name the completion is written as, if the prompt has a character
    pub speaker: Option<String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            stop: Vec::new(),
            speaker: None,
        }
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    /// Set the speaker; a blank name leaves it unset
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        let speaker = speaker.into();
        self.speaker = (!speaker.trim().is_empty()).then_some(speaker);
        self
    }
}

/// Per-call configuration shared by all providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Working directory for process-based providers
    pub working_dir: PathBuf,
    /// Optional timeout (None = no limit)
    pub timeout: Option<std::time::Duration>,
    /// Additional environment variables
    pub env_vars: HashMap<String, String>,
    /// Model to use (if the provider supports it)
    pub model: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            timeout: None,
            env_vars: HashMap::new(),
            model: None,
        }
    }
}

impl ProviderConfig {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_env(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }
}

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Command,
    OpenRouter,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Command => write!(f, "command"),
            ProviderType::OpenRouter => write!(f, "openrouter"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "command" | "cmd" | "process" => Ok(ProviderType::Command),
            "openrouter" | "open-router" => Ok(ProviderType::OpenRouter),
            _ => Err(format!("Unknown provider type: {}", s)),
        }
    }
}

/// Something that turns a composed prompt into one completion
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Human-readable name of the provider (e.g. the miner it stands for)
    fn name(&self) -> &str;

    /// The provider backend
    fn provider_type(&self) -> ProviderType;

    /// Generate one completion for the request
    async fn complete(
        &self,
        request: &CompletionRequest,
        config: &ProviderConfig,
    ) -> Result<CompletionOutput, ProviderError>;

    /// Check if the provider can be reached
    async fn is_available(&self) -> bool;
}
