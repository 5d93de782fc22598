use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A completion returned by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutput {
    /// Completion text, already cut at the first stop sequence
    pub text: String,
    /// Name of the provider that produced it
    pub provider: String,
    /// Duration of the request
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl CompletionOutput {
    pub fn new(text: String, provider: String, duration: Duration) -> Self {
        Self {
            text,
            provider,
            duration,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Cut `text` at the earliest occurrence of any stop sequence and trim it.
pub fn truncate_at_stop(text: &str, stops: &[String]) -> String {
    let end = stops
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min()
        .unwrap_or(text.len());
    text[..end].trim().to_string()
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
