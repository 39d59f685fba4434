//! System prompt loading and chat prompt assembly.
//!
//! Prompt templates live in the `prompts/` directory at the project root. When a
//! file is missing the built-in text is used instead.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::lightrag::ContextBlock;
use crate::{Error, Result};

/// Built-in persona, used when `prompts/rag_assistant.md` is absent.
pub const DEFAULT_PERSONA: &str = "You are a cybersecurity expert.
Answer the user's question accurately and in detail, based on the context provided below.
For information that is not in the context, use general security knowledge, but state clearly that it is an assumption.

### Context:
";

/// Available prompts.
#[derive(Debug, Clone, Copy)]
pub enum Prompt {
    /// Grounded RAG assistant persona.
    RagAssistant,
}

impl Prompt {
    /// Prompt file name (Markdown).
    pub fn filename(&self) -> &'static str {
        match self {
            Prompt::RagAssistant => "rag_assistant.md",
        }
    }

    /// Load prompt from file.
    pub fn load(&self) -> Result<String> {
        load_prompt(self.filename())
    }

    /// Load prompt from file, falling back to the built-in text.
    pub fn load_or_default(&self) -> String {
        self.load().unwrap_or_else(|_| self.builtin().to_string())
    }

    fn builtin(&self) -> &'static str {
        match self {
            Prompt::RagAssistant => DEFAULT_PERSONA,
        }
    }
}

/// Load prompt by file name.
pub fn load_prompt(filename: &str) -> Result<String> {
    let path = prompts_dir().join(filename);
    std::fs::read_to_string(&path)
        .map_err(|e| Error::InvalidArgument(format!("Failed to load prompt {}: {}", filename, e)))
}

/// Path to the prompts directory.
pub fn prompts_dir() -> PathBuf {
    let candidates = [
        PathBuf::from("prompts"),
        PathBuf::from("../prompts"),
        PathBuf::from("../../prompts"),
    ];

    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    PathBuf::from("prompts")
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Builds the message list sent to the language model.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::with_persona(DEFAULT_PERSONA)
    }
}

impl PromptAssembler {
    /// Persona from `prompts/rag_assistant.md`, or the built-in one.
    pub fn from_prompt_files() -> Self {
        Self::with_persona(Prompt::RagAssistant.load_or_default())
    }

    pub fn with_persona(persona: impl Into<String>) -> Self {
        let mut persona = persona.into();
        if !persona.ends_with('\n') {
            persona.push('\n');
        }
        Self { persona }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// System message (persona + rendered context), then history, then the query.
    ///
    /// History is passed through as-is; role alternation is not checked.
    pub fn assemble(
        &self,
        context: &ContextBlock,
        history: &[ChatMessage],
        query: &str,
    ) -> Vec<ChatMessage> {
        let mut system = String::with_capacity(self.persona.len() + 256);
        system.push_str(&self.persona);
        system.push_str(&context.render());

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(query));
        messages
    }
}
