//! Retrieved knowledge-graph hits and their rendering into the prompt context.

use std::fmt;

/// Characters of entity content kept in a rendered line.
pub const ENTITY_CONTENT_CHARS: usize = 300;
/// Characters of relation content kept in a rendered line.
pub const RELATION_CONTENT_CHARS: usize = 200;

pub const ENTITY_HEADER: &str = "## Related concepts/entities:";
pub const RELATION_HEADER: &str = "## Related relations:";

/// Entity row from the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityHit {
    pub name: String,
    pub content: String,
    /// Cosine distance to the query; lower is more relevant
    pub distance: f64,
}

impl EntityHit {
    pub fn new(name: impl Into<String>, content: impl Into<String>, distance: f64) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            distance,
        }
    }

    fn line(&self) -> String {
        format!(
            "- {}: {}",
            self.name,
            truncate_chars(&self.content, ENTITY_CONTENT_CHARS)
        )
    }
}

/// Relation row from the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationHit {
    pub source: String,
    pub target: String,
    pub content: String,
    pub distance: f64,
}

impl RelationHit {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        content: impl Into<String>,
        distance: f64,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            content: content.into(),
            distance,
        }
    }

    fn line(&self) -> String {
        format!(
            "- {} → {}: {}",
            self.source,
            self.target,
            truncate_chars(&self.content, RELATION_CONTENT_CHARS)
        )
    }
}

/// Context injected into the system prompt.
///
/// Both sections are always rendered, even when empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBlock {
    pub entities: Vec<EntityHit>,
    pub relations: Vec<RelationHit>,
}

impl ContextBlock {
    /// Wrap hits as-is (no filtering).
    pub fn new(entities: Vec<EntityHit>, relations: Vec<RelationHit>) -> Self {
        Self {
            entities,
            relations,
        }
    }

    /// Keep only hits with `distance < threshold`, preserving retrieval order.
    pub fn from_hits(entities: Vec<EntityHit>, relations: Vec<RelationHit>, threshold: f64) -> Self {
        Self {
            entities: entities
                .into_iter()
                .filter(|hit| hit.distance < threshold)
                .collect(),
            relations: relations
                .into_iter()
                .filter(|hit| hit.distance < threshold)
                .collect(),
        }
    }

    /// No surviving hits in either section.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(self.entities.len() + self.relations.len() + 2);

        parts.push(ENTITY_HEADER.to_string());
        parts.extend(self.entities.iter().map(EntityHit::line));

        parts.push(format!("\n{}", RELATION_HEADER));
        parts.extend(self.relations.iter().map(RelationHit::line));

        f.write_str(&parts.join("\n"))
    }
}

/// First `max` characters of `text` (not bytes), without an ellipsis.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
