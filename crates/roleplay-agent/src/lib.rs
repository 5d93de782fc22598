mod command;
mod openrouter;
mod output;
mod spawner;
mod traits;

pub use command::CommandProvider;
pub use openrouter::{OpenRouterProvider, OPENROUTER_API_KEY_ENV};
pub use output::{truncate_at_stop, CompletionOutput};
pub use spawner::{ProcessOutput, ProcessSpawner};
pub use traits::{
    CompletionProvider, CompletionRequest, ProviderConfig, ProviderError, ProviderType,
};
