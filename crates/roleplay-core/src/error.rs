use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoundError {
    #[error("Character source error: {0}")]
    SourceError(#[from] roleplay_characters::SourceError),

    #[error("No completion providers configured")]
    NoProviders,
}
