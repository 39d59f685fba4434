//! Error types for the RAG chat pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for Error {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Error::Generation(err.to_string())
    }
}
