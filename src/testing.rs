//! In-memory stand-ins for the embedding, store and generation services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use crate::integrations::{ChatBackend, DeltaStream, Embedder};
use crate::lightrag::{EntityHit, RelationHit, StoreSession, VectorStore};
use crate::prompts::ChatMessage;
use crate::{Error, Result};

type Request = (String, String, usize);

pub struct FakeEmbedder {
    vector: Option<Vec<f32>>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn ok(vector: Vec<f32>) -> Self {
        Self {
            vector: Some(vector),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            vector: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vector
            .clone()
            .ok_or_else(|| Error::EmbeddingUnavailable("connection refused".to_string()))
    }
}

pub struct FakeSession {
    entities: Vec<EntityHit>,
    relations: Vec<RelationHit>,
    fail: bool,
    requests: Arc<Mutex<Vec<Request>>>,
    closed: Arc<AtomicUsize>,
}

impl FakeSession {
    pub fn new(entities: Vec<EntityHit>, relations: Vec<RelationHit>) -> Self {
        Self {
            entities,
            relations,
            fail: false,
            requests: Arc::default(),
            closed: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![], vec![])
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, kind: &str, namespace: &str, limit: usize) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .push((kind.to_string(), namespace.to_string(), limit));
        if self.fail {
            return Err(Error::Store("relation \"lightrag_vdb_entity\" does not exist".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreSession for FakeSession {
    async fn nearest_entities(
        &mut self,
        namespace: &str,
        _vector: &[f32],
        limit: usize,
    ) -> Result<Vec<EntityHit>> {
        self.record("entities", namespace, limit)?;
        Ok(self.entities.clone())
    }

    async fn nearest_relations(
        &mut self,
        namespace: &str,
        _vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RelationHit>> {
        self.record("relations", namespace, limit)?;
        Ok(self.relations.clone())
    }

    async fn close(self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub entities: Vec<EntityHit>,
    pub relations: Vec<RelationHit>,
    pub fail_queries: bool,
    pub fail_open: bool,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl FakeStore {
    pub fn new(entities: Vec<EntityHit>, relations: Vec<RelationHit>) -> Self {
        Self {
            entities,
            relations,
            ..Default::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    type Session = FakeSession;

    async fn open(&self) -> Result<FakeSession> {
        if self.fail_open {
            return Err(Error::Store("connection refused".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            entities: self.entities.clone(),
            relations: self.relations.clone(),
            fail: self.fail_queries,
            requests: Arc::default(),
            closed: Arc::clone(&self.closed),
        })
    }
}

/// Scripted generation output; `Err` items become mid-stream errors.
#[derive(Default)]
pub struct FakeBackend {
    script: Vec<std::result::Result<Option<String>, String>>,
    reject: bool,
    captured: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeBackend {
    pub fn replying(fragments: &[&str]) -> Self {
        Self {
            script: fragments.iter().map(|f| Ok(Some(f.to_string()))).collect(),
            ..Default::default()
        }
    }

    pub fn scripted(script: Vec<std::result::Result<Option<String>, String>>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn captured(&self) -> Vec<Vec<ChatMessage>> {
        self.captured.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<DeltaStream> {
        self.captured.lock().unwrap().push(messages);
        if self.reject {
            return Err(Error::Generation("401 Unauthorized".to_string()));
        }
        let items: Vec<Result<Option<String>>> = self
            .script
            .iter()
            .map(|item| item.clone().map_err(Error::Generation))
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}
