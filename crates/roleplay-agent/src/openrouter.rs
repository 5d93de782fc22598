use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::{
    truncate_at_stop, CompletionOutput, CompletionProvider, CompletionRequest, ProviderConfig,
    ProviderError, ProviderType,
};

/// Environment variable consulted when no key is configured
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "open-orca/mistral-7b-openorca";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.8;

/// Completion provider backed by the OpenRouter HTTP API.
///
/// The prompt is wrapped in a ChatML user turn and the character's
/// speaker tag is opened for the assistant.
#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenRouterProvider {
    /// Fails with `MissingConfig` when neither `api_key` nor the
    /// `OPENROUTER_API_KEY` environment variable provides a key.
    pub fn new(api_key: Option<String>, model: Option<String>) -> Result<Self, ProviderError> {
        let api_key = api_key
            .or_else(|| std::env::var(OPENROUTER_API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::MissingConfig(format!(
                    "OpenRouter API key is required (set [openrouter] api_key or {})",
                    OPENROUTER_API_KEY_ENV
                ))
            })?;

        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_payload(&self, request: &CompletionRequest, config: &ProviderConfig) -> Value {
        json!({
            "prompt": chatml_prompt(&request.prompt, request.speaker.as_deref()),
            "transforms": ["middle-out"],
            "model": config.model.as_deref().unwrap_or(&self.model),
            "max_tokens": MAX_TOKENS,
            "stop": request.stop,
            "temperature": TEMPERATURE,
        })
    }
}

/// Wrap a composed prompt as one ChatML exchange
fn chatml_prompt(prompt: &str, speaker: Option<&str>) -> String {
    let mut text = format!("<|im_start|>user\n{}<|im_end|>\n<|im_start|>assistant\n", prompt);
    if let Some(name) = speaker {
        text.push_str(name);
        text.push_str(": ");
    }
    text
}

/// Pull the completion text out of an OpenRouter response body.
fn parse_response(body: &Value) -> Result<String, ProviderError> {
    if let Some(message) = body["error"]["message"].as_str() {
        return Err(ProviderError::RequestFailed(message.to_string()));
    }
    let choice = &body["choices"][0];
    choice["text"]
        .as_str()
        .or_else(|| choice["message"]["content"].as_str())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::MalformedResponse("no choices[0].text in response".into()))
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenRouter
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        config: &ProviderConfig,
    ) -> Result<CompletionOutput, ProviderError> {
        let start = Instant::now();
        let payload = self.build_payload(request, config);
        debug!(model = %payload["model"], prompt_len = request.prompt.len(), "Requesting OpenRouter completion");

        let mut http = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", "roleplay")
            .json(&payload);
        if let Some(timeout) = config.timeout {
            http = http.timeout(timeout);
        }

        let response = http
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        if !status.is_success() && body.get("error").is_none() {
            return Err(ProviderError::RequestFailed(format!("HTTP {}", status)));
        }

        let text = parse_response(&body)?;
        info!(chars = text.len(), "OpenRouter completion received");

        Ok(CompletionOutput::new(
            truncate_at_stop(&text, &request.stop),
            self.name().to_string(),
            start.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_key_is_used() {
        let provider = OpenRouterProvider::new(Some("sk-test".into()), None).unwrap();
        assert_eq!(provider.model(), DEFAULT_MODEL);
        assert_eq!(provider.api_key, "sk-test");
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let result = OpenRouterProvider::new(Some("  ".into()), None);
        assert!(matches!(result, Err(ProviderError::MissingConfig(_))));
    }

    #[test]
    fn test_payload() {
        let provider = OpenRouterProvider::new(Some("sk-test".into()), None).unwrap();
        let request = CompletionRequest::new("Write a message.")
            .with_stop(vec!["User:".into(), "Ava:".into()])
            .with_speaker("Ava");
        let payload = provider.build_payload(&request, &ProviderConfig::default());

        assert_eq!(payload["model"], DEFAULT_MODEL);
        assert_eq!(payload["max_tokens"], 500);
        assert_eq!(payload["temperature"], 0.8);
        assert_eq!(payload["transforms"], json!(["middle-out"]));
        assert_eq!(payload["stop"], json!(["User:", "Ava:"]));
        assert!(payload["prompt"]
            .as_str()
            .unwrap()
            .ends_with("<|im_start|>assistant\nAva: "));

        let config = ProviderConfig::default().with_model("gryphe/mythomax-l2-13b".into());
        assert_eq!(
            provider.build_payload(&request, &config)["model"],
            "gryphe/mythomax-l2-13b"
        );
    }

    #[test]
    fn test_speaker_does_not_depend_on_stop_order() {
        let provider = OpenRouterProvider::new(Some("sk-test".into()), None).unwrap();
        let request = CompletionRequest::new("Write a message.")
            .with_stop(vec!["Ava:".into(), "User:".into()])
            .with_speaker("Ava");
        let payload = provider.build_payload(&request, &ProviderConfig::default());
        assert!(payload["prompt"]
            .as_str()
            .unwrap()
            .ends_with("assistant\nAva: "));

        let anonymous = CompletionRequest::new("Write a message.")
            .with_stop(vec!["User:".into(), "Ava:".into()])
            .with_speaker("  ");
        let payload = provider.build_payload(&anonymous, &ProviderConfig::default());
        assert!(payload["prompt"]
            .as_str()
            .unwrap()
            .ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn test_parse_response() {
        let body = json!({"choices": [{"text": " *smiles* Hi!"}]});
        assert_eq!(parse_response(&body).unwrap(), " *smiles* Hi!");

        let chat = json!({"choices": [{"message": {"content": "Hello"}}]});
        assert_eq!(parse_response(&chat).unwrap(), "Hello");

        assert!(matches!(
            parse_response(&json!({"choices": []})),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(&json!({"error": {"message": "No auth"}})),
            Err(ProviderError::RequestFailed(_))
        ));
    }
}
