//! Streaming RAG chat: embed the query, retrieve LightRAG context, assemble the
//! prompt and stream the model's answer.
//!
//! Failures that end a turn early are reported in-band as a [`Fragment::Notice`]
//! carrying a [`TurnFailure`]; only vector store errors surface as `Err` items.

use std::borrow::Cow;
use std::fmt;

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::integrations::{ChatBackend, Embedder};
use crate::lightrag::{ContextBlock, ContextRetriever, StoreSession, VectorStore};
use crate::prompts::{ChatMessage, PromptAssembler};
use crate::{Error, Result};

/// Why a turn stopped before the model finished answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnFailure {
    /// The query could not be embedded; nothing was retrieved or generated.
    EmbeddingUnavailable(String),
    /// The generation request was rejected or the stream broke off.
    Generation(String),
}

impl TurnFailure {
    /// Metric label for the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            TurnFailure::EmbeddingUnavailable(_) => "embedding_failed",
            TurnFailure::Generation(_) => "generation_failed",
        }
    }
}

impl fmt::Display for TurnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnFailure::EmbeddingUnavailable(_) => {
                f.write_str("Failed to create the query embedding.")
            }
            TurnFailure::Generation(reason) => write!(f, "\nGeneration error: {}", reason),
        }
    }
}

/// One piece of streamed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Model text, verbatim and in arrival order.
    Text(String),
    /// Terminal, user-visible failure notice.
    Notice(TurnFailure),
}

impl Fragment {
    /// Text shown to the user.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Fragment::Text(text) => Cow::Borrowed(text),
            Fragment::Notice(failure) => Cow::Owned(failure.to_string()),
        }
    }

    pub fn failure(&self) -> Option<&TurnFailure> {
        match self {
            Fragment::Notice(failure) => Some(failure),
            Fragment::Text(_) => None,
        }
    }
}

fn reason(err: Error) -> String {
    match err {
        Error::EmbeddingUnavailable(msg) | Error::Generation(msg) => msg,
        other => other.to_string(),
    }
}

/// The RAG pipeline, generic over its three external services.
pub struct RagChat<E, S, G> {
    embedder: E,
    store: S,
    backend: G,
    retriever: ContextRetriever,
    assembler: PromptAssembler,
}

impl<E, S, G> RagChat<E, S, G>
where
    E: Embedder,
    S: VectorStore,
    G: ChatBackend,
{
    pub fn new(
        embedder: E,
        store: S,
        backend: G,
        retriever: ContextRetriever,
        assembler: PromptAssembler,
    ) -> Self {
        Self {
            embedder,
            store,
            backend,
            retriever,
            assembler,
        }
    }

    pub fn retriever(&self) -> &ContextRetriever {
        &self.retriever
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backend(&self) -> &G {
        &self.backend
    }

    /// Open a session, retrieve, and close the session on every path.
    async fn retrieve_context(&self, vector: &[f32]) -> Result<ContextBlock> {
        let mut session = self.store.open().await?;
        let result = self.retriever.retrieve(&mut session, vector).await;

        if let Err(err) = session.close().await {
            warn!("Failed to close vector store connection: {}", err);
        }

        result
    }

    /// Stream the answer to `query` given prior `history`.
    ///
    /// The stream is finite and single-use. An embedding or generation failure
    /// yields one [`Fragment::Notice`] and ends the stream; a store failure
    /// yields one `Err` and ends it.
    pub fn stream_chat<'a>(
        &'a self,
        query: &'a str,
        history: &'a [ChatMessage],
    ) -> impl Stream<Item = Result<Fragment>> + 'a {
        async_stream::stream! {
            let vector = match self.embedder.embed(query).await {
                Ok(vector) => vector,
                Err(err) => {
                    warn!("Embedding failed: {}", err);
                    yield Ok(Fragment::Notice(TurnFailure::EmbeddingUnavailable(reason(err))));
                    return;
                }
            };

            let context = match self.retrieve_context(&vector).await {
                Ok(context) => context,
                Err(err) => {
                    warn!("Context retrieval failed: {}", err);
                    yield Err(err);
                    return;
                }
            };

            let messages = self.assembler.assemble(&context, history, query);
            debug!(messages = messages.len(), "Prompt assembled");

            let mut deltas = match self.backend.stream_chat(messages).await {
                Ok(deltas) => deltas,
                Err(err) => {
                    warn!("Generation request failed: {}", err);
                    yield Ok(Fragment::Notice(TurnFailure::Generation(reason(err))));
                    return;
                }
            };

            let mut fragments = 0usize;
            while let Some(item) = deltas.next().await {
                match item {
                    Ok(Some(text)) if !text.is_empty() => {
                        fragments += 1;
                        yield Ok(Fragment::Text(text));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(fragments, "Generation stream failed: {}", err);
                        yield Ok(Fragment::Notice(TurnFailure::Generation(reason(err))));
                        return;
                    }
                }
            }

            info!(fragments, "Answer streamed");
        }
    }

    /// Drain [`Self::stream_chat`] and concatenate the fragments in order.
    pub async fn complete_chat(&self, query: &str, history: &[ChatMessage]) -> Result<String> {
        let mut stream = std::pin::pin!(self.stream_chat(query, history));
        let mut reply = String::new();

        while let Some(fragment) = stream.next().await {
            reply.push_str(&fragment?.text());
        }

        Ok(reply)
    }
}
