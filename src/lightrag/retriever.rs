use tracing::debug;

use super::context::ContextBlock;
use super::store::StoreSession;
use crate::config::RetrievalConfig;
use crate::metrics;
use crate::Result;

/// Selects entity and relation context for a query vector.
#[derive(Debug, Clone, Default)]
pub struct ContextRetriever {
    config: RetrievalConfig,
}

impl ContextRetriever {
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Query entities then relations on `session`, drop hits at or above the
    /// distance threshold, and keep retrieval order.
    ///
    /// Store errors are returned as-is; the caller owns the session and closes it.
    pub async fn retrieve<S: StoreSession>(
        &self,
        session: &mut S,
        query_vector: &[f32],
    ) -> Result<ContextBlock> {
        let cfg = &self.config;

        let mut entities = session
            .nearest_entities(&cfg.workspace, query_vector, cfg.entity_top_k)
            .await?;
        entities.truncate(cfg.entity_top_k);

        let mut relations = session
            .nearest_relations(&cfg.workspace, query_vector, cfg.relation_top_k)
            .await?;
        relations.truncate(cfg.relation_top_k);

        let fetched = (entities.len(), relations.len());
        let block = ContextBlock::from_hits(entities, relations, cfg.distance_threshold);

        debug!(
            workspace = %cfg.workspace,
            entities = block.entities.len(),
            relations = block.relations.len(),
            fetched_entities = fetched.0,
            fetched_relations = fetched.1,
            "LightRAG context selected"
        );
        metrics::record_context_hits(block.entities.len(), block.relations.len());

        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lightrag::{EntityHit, RelationHit};
    use crate::testing::FakeSession;
    use crate::Error;

    fn entity(name: &str, distance: f64) -> EntityHit {
        EntityHit::new(name, format!("{} description", name), distance)
    }

    #[tokio::test]
    async fn retrieve_filters_by_threshold_and_keeps_order() {
        let mut session = FakeSession::new(
            vec![
                entity("Mimikatz", 0.12),
                entity("PsExec", 0.45),
                entity("Cobalt Strike", 0.61),
                entity("Excel", 0.70),
            ],
            vec![],
        );
        let retriever = ContextRetriever::new(RetrievalConfig {
            entity_top_k: 4,
            ..Default::default()
        });

        let block = retriever.retrieve(&mut session, &[0.1, 0.2]).await.unwrap();

        let names: Vec<&str> = block.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Mimikatz", "PsExec"]);
        assert!(block.relations.is_empty());
        assert!(block.render().contains("## Related relations:"));
    }

    #[tokio::test]
    async fn retrieve_passes_config_to_store() {
        let mut session = FakeSession::new(vec![], vec![]);
        let retriever = ContextRetriever::new(RetrievalConfig {
            workspace: "security".to_string(),
            ..Default::default()
        });

        retriever.retrieve(&mut session, &[1.0]).await.unwrap();

        assert_eq!(
            session.requests(),
            vec![
                ("entities".to_string(), "security".to_string(), 5),
                ("relations".to_string(), "security".to_string(), 3),
            ]
        );
    }

    #[tokio::test]
    async fn retrieve_caps_results_at_top_k() {
        let many: Vec<EntityHit> = (0..8).map(|i| entity(&format!("e{}", i), 0.1)).collect();
        let mut session = FakeSession::new(many, vec![]);
        let retriever = ContextRetriever::default();

        let block = retriever.retrieve(&mut session, &[1.0]).await.unwrap();

        assert_eq!(block.entities.len(), 5);
    }

    #[tokio::test]
    async fn retrieve_propagates_store_errors() {
        let mut session = FakeSession::failing();
        let retriever = ContextRetriever::default();

        let err = retriever.retrieve(&mut session, &[1.0]).await.unwrap_err();

        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn relations_use_their_own_threshold_pass() {
        let mut session = FakeSession::new(
            vec![],
            vec![
                RelationHit::new("APT29", "Mimikatz", "uses", 0.2),
                RelationHit::new("APT29", "Excel", "mentions", 0.6),
            ],
        );
        let retriever = ContextRetriever::default();

        let block = retriever.retrieve(&mut session, &[1.0]).await.unwrap();

        assert_eq!(block.relations.len(), 1);
        assert_eq!(block.relations[0].target, "Mimikatz");
    }
}
