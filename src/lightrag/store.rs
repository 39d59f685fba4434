//! pgvector-backed LightRAG store.
//!
//! LightRAG keeps its entity and relation vectors in `lightrag_vdb_entity` and
//! `lightrag_vdb_relation`, partitioned by the `workspace` column. Sessions are
//! request-scoped: open, query, close.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, FromRow};
use tracing::debug;

use super::context::{EntityHit, RelationHit};
use crate::config::StoreConfig;
use crate::Result;

pub const ENTITY_TABLE: &str = "lightrag_vdb_entity";
pub const RELATION_TABLE: &str = "lightrag_vdb_relation";

const ENTITY_QUERY: &str = r#"
    SELECT entity_name,
           content,
           (content_vector <=> $1)::float8 AS distance
    FROM lightrag_vdb_entity
    WHERE workspace = $2
    ORDER BY content_vector <=> $1
    LIMIT $3
"#;

const RELATION_QUERY: &str = r#"
    SELECT source_id,
           target_id,
           content,
           (content_vector <=> $1)::float8 AS distance
    FROM lightrag_vdb_relation
    WHERE workspace = $2
    ORDER BY content_vector <=> $1
    LIMIT $3
"#;

/// Opens request-scoped sessions against the vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    type Session: StoreSession;

    async fn open(&self) -> Result<Self::Session>;
}

/// One open connection. Results are ordered by ascending distance.
#[async_trait]
pub trait StoreSession: Send + Sized {
    async fn nearest_entities(
        &mut self,
        namespace: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<EntityHit>>;

    async fn nearest_relations(
        &mut self,
        namespace: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RelationHit>>;

    async fn close(self) -> Result<()>;
}

/// Row counts for one workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub entities: i64,
    pub relations: i64,
}

/// PostgreSQL + pgvector store.
#[derive(Debug, Clone)]
pub struct PgVectorStore {
    options: PgConnectOptions,
}

impl PgVectorStore {
    pub fn new(config: &StoreConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .application_name("lightrag_chat");

        Self { options }
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    type Session = PgSession;

    async fn open(&self) -> Result<PgSession> {
        let conn = PgConnection::connect_with(&self.options).await?;
        debug!("Opened vector store connection");
        Ok(PgSession { conn })
    }
}

/// Single PostgreSQL connection.
pub struct PgSession {
    conn: PgConnection,
}

impl PgSession {
    /// Whether the LightRAG entity table exists.
    pub async fn tables_present(&mut self) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(ENTITY_TABLE)
        .fetch_one(&mut self.conn)
        .await?;

        Ok(exists)
    }

    /// Entity and relation counts for a workspace.
    pub async fn stats(&mut self, namespace: &str) -> Result<StoreStats> {
        let entities: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM lightrag_vdb_entity WHERE workspace = $1")
                .bind(namespace)
                .fetch_one(&mut self.conn)
                .await?;

        let relations: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM lightrag_vdb_relation WHERE workspace = $1")
                .bind(namespace)
                .fetch_one(&mut self.conn)
                .await?;

        Ok(StoreStats {
            entities,
            relations,
        })
    }
}

#[async_trait]
impl StoreSession for PgSession {
    async fn nearest_entities(
        &mut self,
        namespace: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<EntityHit>> {
        let rows = sqlx::query_as::<_, EntityRow>(ENTITY_QUERY)
            .bind(Vector::from(vector.to_vec()))
            .bind(namespace)
            .bind(limit as i64)
            .fetch_all(&mut self.conn)
            .await?;

        Ok(rows.into_iter().map(EntityHit::from).collect())
    }

    async fn nearest_relations(
        &mut self,
        namespace: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RelationHit>> {
        let rows = sqlx::query_as::<_, RelationRow>(RELATION_QUERY)
            .bind(Vector::from(vector.to_vec()))
            .bind(namespace)
            .bind(limit as i64)
            .fetch_all(&mut self.conn)
            .await?;

        Ok(rows.into_iter().map(RelationHit::from).collect())
    }

    async fn close(self) -> Result<()> {
        self.conn.close().await?;
        debug!("Closed vector store connection");
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct EntityRow {
    entity_name: String,
    content: Option<String>,
    distance: f64,
}

impl From<EntityRow> for EntityHit {
    fn from(row: EntityRow) -> Self {
        EntityHit::new(row.entity_name, row.content.unwrap_or_default(), row.distance)
    }
}

#[derive(Debug, FromRow)]
struct RelationRow {
    source_id: String,
    target_id: String,
    content: Option<String>,
    distance: f64,
}

impl From<RelationRow> for RelationHit {
    fn from(row: RelationRow) -> Self {
        RelationHit::new(
            row.source_id,
            row.target_id,
            row.content.unwrap_or_default(),
            row.distance,
        )
    }
}
