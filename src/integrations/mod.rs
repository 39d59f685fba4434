//! External integrations module.
//!
//! Provides clients for:
//! - Ollama (query embeddings)
//! - Azure OpenAI (streaming chat completions)
//!
//! Both sit behind small traits so the chat pipeline can run against
//! in-memory fakes.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::prompts::ChatMessage;
use crate::Result;

pub mod azure;
pub mod ollama;

pub use azure::AzureChatClient;
pub use ollama::OllamaClient;

/// Incremental generation output. `None` marks a chunk that carried no text.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Option<String>>> + Send>>;

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text. Fails with [`crate::Error::EmbeddingUnavailable`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Chat-style language model with streaming output.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start a streaming completion over `messages`.
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<DeltaStream>;
}
