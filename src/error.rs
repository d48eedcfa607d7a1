//! Error types shared by the game core and its collaborators.

use thiserror::Error;

/// Failures that end up on the Error stage.
#[derive(Debug, Error)]
pub enum TriviaError {
    /// The content provider failed or returned something unusable while loading questions.
    #[error("{0}")]
    ContentGeneration(String),

    /// The content provider failed while scoring a finished batch.
    #[error("{0}")]
    Evaluation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by a [`ContentProvider`](crate::quiz::ai_helper::ContentProvider).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("ChatGPT request failed: {0}")]
    ChatGpt(#[from] chatgpt::err::Error),

    #[error("could not parse provider payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but breaks an invariant (option count, missing answer, ...).
    #[error("malformed provider payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("profile store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile blob is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported profile blob version {0}")]
    UnsupportedVersion(u32),

    #[error("profile store lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, TriviaError>;
