//! LightRAG Chat Library
//!
//! Retrieval-augmented chat over a LightRAG knowledge base:
//! - Embeds user queries with Ollama
//! - Retrieves nearby entities and relations from PostgreSQL + pgvector
//! - Streams answers from an Azure OpenAI chat deployment
//! - Keeps a bounded conversation history for interactive sessions

pub mod chat;
pub mod config;
pub mod error;
pub mod history;
pub mod integrations;
pub mod lightrag;
pub mod metrics;
pub mod prompts;

#[cfg(test)]
pub(crate) mod testing;

// Re-export common types
pub use chat::{Fragment, RagChat, TurnFailure};
pub use config::Config;
pub use error::{Error, Result};
pub use history::ConversationHistory;
pub use integrations::{AzureChatClient, ChatBackend, Embedder, OllamaClient};
pub use prompts::{load_prompt, ChatMessage, Prompt, PromptAssembler, Role};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
