use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::{
    truncate_at_stop, CompletionOutput, CompletionProvider, CompletionRequest, ProviderConfig,
    ProviderError, ProviderType, ProcessSpawner,
};

/// A local executable that prints a completion for the prompt it is given.
///
/// The prompt is passed as the last positional argument. Stop sequences are
/// applied to the captured stdout.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    name: String,
    binary_path: PathBuf,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(binary_path: PathBuf, args: Vec<String>) -> Self {
        let name = binary_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| binary_path.display().to_string());
        Self {
            name,
            binary_path,
            args,
        }
    }

    /// Build from a whitespace-separated command line such as
    /// `"./miner.sh --temperature 0.8"`.
    pub fn from_command_line(command: &str) -> Result<Self, ProviderError> {
        let mut parts = command.split_whitespace();
        let binary = parts
            .next()
            .ok_or_else(|| ProviderError::ConfigError("empty provider command".into()))?;
        Ok(Self::new(
            PathBuf::from(binary),
            parts.map(str::to_string).collect(),
        ))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl CompletionProvider for CommandProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Command
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .is_ok()
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        config: &ProviderConfig,
    ) -> Result<CompletionOutput, ProviderError> {
        debug!(
            provider = self.name(),
            prompt_len = request.prompt.len(),
            "Requesting completion"
        );

        let mut args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        args.push(&request.prompt);

        let output = ProcessSpawner::spawn(&self.binary_path, &args, config).await?;
        if !output.is_success() {
            return Err(ProviderError::ExecutionFailed(format!(
                "{} exited with code {}: {}",
                self.name,
                output.exit_code,
                output.stderr.trim()
            )));
        }

        Ok(CompletionOutput::new(
            truncate_at_stop(&output.stdout, &request.stop),
            self.name.clone(),
            output.duration,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_from_command_line() {
        let provider = CommandProvider::from_command_line("./miner.sh --temperature 0.8").unwrap();
        assert_eq!(provider.name(), "miner.sh");
        assert_eq!(provider.binary_path(), Path::new("./miner.sh"));
        assert_eq!(provider.args, vec!["--temperature", "0.8"]);

        assert!(matches!(
            CommandProvider::from_command_line("   "),
            Err(ProviderError::ConfigError(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo_completion_is_cut_at_stop() {
        let provider = CommandProvider::from_command_line("echo").unwrap();
        let request = CompletionRequest::new("*beeps happily* Hello there! User: go on")
            .with_stop(vec!["User:".into(), "Ava:".into()]);

        let output = provider
            .complete(&request, &ProviderConfig::default())
            .await
            .unwrap();
        assert_eq!(output.text, "*beeps happily* Hello there!");
        assert_eq!(output.provider, "echo");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let provider = CommandProvider::from_command_line("false").unwrap();
        let result = provider
            .complete(&CompletionRequest::new("hi"), &ProviderConfig::default())
            .await;
        assert!(matches!(result, Err(ProviderError::ExecutionFailed(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let provider = CommandProvider::from_command_line("sleep").unwrap();
        let config = ProviderConfig::default().with_timeout(Duration::from_millis(50));
        let result = provider
            .complete(&CompletionRequest::new("5"), &config)
            .await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let provider = CommandProvider::from_command_line("definitely-not-a-miner-binary").unwrap();
        assert!(!provider.is_available().await);
        let result = provider
            .complete(&CompletionRequest::new("hi"), &ProviderConfig::default())
            .await;
        assert!(matches!(result, Err(ProviderError::SpawnFailed(_))));
    }
}
