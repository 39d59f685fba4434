//! LightRAG context retrieval over a pgvector store.
//!
//! Entities and relations indexed by LightRAG are looked up by cosine distance
//! to the query vector, filtered by a distance threshold and rendered into the
//! text block injected into the system prompt.

pub mod context;
pub mod retriever;
pub mod store;

pub use context::{truncate_chars, ContextBlock, EntityHit, RelationHit};
pub use retriever::ContextRetriever;
pub use store::{PgSession, PgVectorStore, StoreSession, StoreStats, VectorStore};
