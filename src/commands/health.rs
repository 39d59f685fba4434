//! `health` and `stats` subcommands.

use std::fmt;
use std::io::Write;

use tracing::{info, warn};

use crate::config::{Config, GenerationConfig};
use crate::integrations::OllamaClient;
use crate::lightrag::{PgVectorStore, StoreSession, StoreStats, VectorStore};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Ok(String),
    Warn(String),
    Fail(String),
}

impl CheckStatus {
    pub fn is_fail(&self) -> bool {
        matches!(self, CheckStatus::Fail(_))
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Ok(detail) => write!(f, "OK    {}", detail),
            CheckStatus::Warn(detail) => write!(f, "WARN  {}", detail),
            CheckStatus::Fail(detail) => write!(f, "FAIL  {}", detail),
        }
    }
}

/// Result of probing the three external services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub embedding: CheckStatus,
    pub store: CheckStatus,
    pub generation: CheckStatus,
}

impl HealthReport {
    /// Healthy unless some check failed; warnings do not count.
    pub fn is_healthy(&self) -> bool {
        !(self.embedding.is_fail() || self.store.is_fail() || self.generation.is_fail())
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Embedding (Ollama):       {}", self.embedding)?;
        writeln!(f, "Vector store (pgvector):  {}", self.store)?;
        write!(f, "Generation (Azure):       {}", self.generation)
    }
}

/// Ollama reachability and whether the embedding model is pulled.
pub async fn check_embedding(client: &OllamaClient) -> CheckStatus {
    if !client.is_running().await {
        return CheckStatus::Fail("server not reachable".to_string());
    }

    match client.list_models().await {
        Ok(models) => {
            let wanted = client.model();
            let found = models
                .iter()
                .any(|name| name == wanted || name.split(':').next() == Some(wanted));
            if found {
                CheckStatus::Ok(format!("model {} available", wanted))
            } else {
                CheckStatus::Warn(format!(
                    "model {} not found (available: {})",
                    wanted,
                    models.join(", ")
                ))
            }
        }
        Err(err) => CheckStatus::Warn(format!("could not list models: {}", err)),
    }
}

/// Store connectivity and presence of the LightRAG tables.
pub async fn check_store(store: &PgVectorStore) -> CheckStatus {
    let mut session = match store.open().await {
        Ok(session) => session,
        Err(err) => return CheckStatus::Fail(err.to_string()),
    };

    let status = match session.tables_present().await {
        Ok(true) => CheckStatus::Ok("connected, LightRAG tables present".to_string()),
        Ok(false) => CheckStatus::Fail("connected, but lightrag_vdb_entity is missing".to_string()),
        Err(err) => CheckStatus::Fail(err.to_string()),
    };

    if let Err(err) = session.close().await {
        warn!("Failed to close vector store connection: {}", err);
    }
    status
}

/// Endpoint and key are set; no request is made.
pub fn check_generation(config: &GenerationConfig) -> CheckStatus {
    if config.is_configured() {
        CheckStatus::Ok(format!("deployment {} at {}", config.deployment, config.endpoint))
    } else {
        CheckStatus::Fail("AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY must be set".to_string())
    }
}

pub async fn check(config: &Config) -> Result<HealthReport> {
    let ollama = OllamaClient::new(&config.embedding)?;
    let store = PgVectorStore::new(&config.store);

    let report = HealthReport {
        embedding: check_embedding(&ollama).await,
        store: check_store(&store).await,
        generation: check_generation(&config.generation),
    };
    info!(healthy = report.is_healthy(), "Health check finished");
    Ok(report)
}

/// Print the report; returns whether every service is usable.
pub async fn run_health<W: Write>(config: &Config, out: &mut W) -> Result<bool> {
    let report = check(config).await?;
    writeln!(out, "{}", report)?;
    Ok(report.is_healthy())
}

/// Entity and relation counts for the configured workspace.
pub async fn fetch_stats(store: &PgVectorStore, workspace: &str) -> Result<StoreStats> {
    let mut session = store.open().await?;
    let result = session.stats(workspace).await;

    if let Err(err) = session.close().await {
        warn!("Failed to close vector store connection: {}", err);
    }
    result
}

pub async fn run_stats<W: Write>(config: &Config, out: &mut W) -> Result<()> {
    let store = PgVectorStore::new(&config.store);
    let workspace = &config.retrieval.workspace;
    let stats = fetch_stats(&store, workspace).await?;

    writeln!(out, "Workspace: {}", workspace)?;
    writeln!(out, "Entities:  {}", stats.entities)?;
    writeln!(out, "Relations: {}", stats.relations)?;
    Ok(())
}
