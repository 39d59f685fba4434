//! Integration tests for lightrag_chat library
//!
//! These tests verify the public API and module interactions.

use lightrag_chat::{
    config::{Config, DEFAULT_DISTANCE_THRESHOLD, DEFAULT_HISTORY_LIMIT},
    error::Error,
    lightrag::{ContextBlock, EntityHit, RelationHit},
    prompts::{ChatMessage, Prompt, PromptAssembler, Role},
    ConversationHistory, Fragment, TurnFailure,
};

// ============================================================================
// Context Tests
// ============================================================================

#[test]
fn test_context_threshold_keeps_close_hits_in_order() {
    let entities = vec![
        EntityHit::new("Mimikatz", "Credential dumping tool", 0.12),
        EntityHit::new("PsExec", "Remote execution tool", 0.45),
        EntityHit::new("Cobalt Strike", "C2 framework", 0.61),
        EntityHit::new("Excel", "Spreadsheet", 0.70),
    ];

    let block = ContextBlock::from_hits(entities, vec![], DEFAULT_DISTANCE_THRESHOLD);
    let rendered = block.render();

    let lines: Vec<&str> = rendered.lines().filter(|l| l.starts_with("- ")).collect();
    assert_eq!(
        lines,
        vec![
            "- Mimikatz: Credential dumping tool",
            "- PsExec: Remote execution tool"
        ]
    );
}

#[test]
fn test_context_threshold_is_strict() {
    let block = ContextBlock::from_hits(
        vec![EntityHit::new("Edge", "exactly at threshold", 0.6)],
        vec![RelationHit::new("A", "B", "exactly at threshold", 0.6)],
        0.6,
    );

    assert!(block.is_empty());
}

#[test]
fn test_empty_context_renders_both_headers() {
    let rendered = ContextBlock::default().render();

    assert_eq!(
        rendered,
        "## Related concepts/entities:\n\n## Related relations:"
    );
}

#[test]
fn test_context_truncates_content_by_characters() {
    let block = ContextBlock::new(
        vec![EntityHit::new("Long", "가".repeat(400), 0.1)],
        vec![RelationHit::new("A", "B", "é".repeat(250), 0.1)],
    );
    let rendered = block.render();

    let entity_line = rendered.lines().nth(1).unwrap();
    assert_eq!(entity_line, format!("- Long: {}", "가".repeat(300)));

    let relation_line = rendered.lines().last().unwrap();
    assert_eq!(relation_line, format!("- A → B: {}", "é".repeat(200)));
}

// ============================================================================
// Prompt Tests
// ============================================================================

#[test]
fn test_assembled_prompt_layout() {
    let block = ContextBlock::new(
        vec![EntityHit::new("APT29", "Threat actor", 0.2)],
        vec![RelationHit::new("APT29", "Mimikatz", "uses", 0.3)],
    );
    let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];

    let messages = PromptAssembler::default().assemble(&block, &history, "Who is APT29?");

    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("- APT29: Threat actor"));
    assert!(messages[0].content.contains("- APT29 → Mimikatz: uses"));
    assert_eq!(messages[3], ChatMessage::user("Who is APT29?"));
}

#[test]
fn test_prompt_file_falls_back_to_builtin() {
    let persona = Prompt::RagAssistant.load_or_default();
    assert!(persona.contains("### Context:"));
}

// ============================================================================
// History Tests
// ============================================================================

#[test]
fn test_history_window() {
    let mut history = ConversationHistory::default();
    assert_eq!(history.limit(), DEFAULT_HISTORY_LIMIT);

    for n in 1..=6 {
        history.record_exchange(format!("q{}", n), format!("a{}", n));
    }

    assert_eq!(history.len(), 10);
    assert_eq!(history.messages()[0], ChatMessage::user("q2"));
    assert_eq!(
        history.messages().last(),
        Some(&ChatMessage::assistant("a6"))
    );
}

// ============================================================================
// Fragment Tests
// ============================================================================

#[test]
fn test_failure_notices_render_user_text() {
    let embedding = Fragment::Notice(TurnFailure::EmbeddingUnavailable("refused".into()));
    assert_eq!(embedding.text(), "Failed to create the query embedding.");

    let generation = Fragment::Notice(TurnFailure::Generation("timeout".into()));
    assert_eq!(generation.text(), "\nGeneration error: timeout");

    assert!(Fragment::Text("plain".into()).failure().is_none());
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_yaml_retrieval_section() {
    let config = Config::from_yaml_str(
        r#"
retrieval:
  entity_top_k: 7
  relation_top_k: 2
  distance_threshold: 0.5
chat:
  history_limit: 6
"#,
    )
    .unwrap();

    assert_eq!(config.retrieval.entity_top_k, 7);
    assert_eq!(config.retrieval.relation_top_k, 2);
    assert_eq!(config.retrieval.distance_threshold, 0.5);
    assert_eq!(config.history_limit, 6);
}

#[test]
fn test_config_rejects_invalid_threshold() {
    let err = Config::from_yaml_str("retrieval:\n  distance_threshold: 3.0\n").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yml");
    std::fs::write(&path, "retrieval:\n  relation_top_k: 4\n").unwrap();

    let config = Config::load_from_file(&path).unwrap();

    assert_eq!(config.retrieval.relation_top_k, 4);
}
