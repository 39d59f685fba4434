//! LightRAG Chat CLI - main entry point
//!
//! With a query argument the answer is streamed once; without one an
//! interactive session starts.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lightrag_chat::commands;
use lightrag_chat::lightrag::{ContextRetriever, PgVectorStore};
use lightrag_chat::{
    metrics, AzureChatClient, Config, ConversationHistory, OllamaClient, PromptAssembler, RagChat,
};

#[derive(Parser)]
#[command(name = "lightrag_chat")]
#[command(about = "Retrieval-augmented chat over a LightRAG knowledge base", long_about = None)]
#[command(version, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR", global = true)]
    metrics_addr: Option<String>,

    /// Question to answer once; starts an interactive session when omitted
    query: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check Ollama, the vector store and the Azure configuration
    Health,

    /// Show entity and relation counts for the workspace
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging; stdout is reserved for answers
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("lightrag_chat=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = Config::load().context("failed to load configuration")?;

    match cli.command {
        Some(Commands::Health) => {
            let healthy = commands::run_health(&config, &mut io::stdout()).await?;
            Ok(if healthy {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(Commands::Stats) => {
            commands::run_stats(&config, &mut io::stdout())
                .await
                .context("failed to read store statistics")?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            run_chat(&config, cli.query.join(" ")).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_chat(config: &Config, query: String) -> anyhow::Result<()> {
    let embedder = OllamaClient::new(&config.embedding).context("failed to create Ollama client")?;
    let backend =
        AzureChatClient::new(&config.generation).context("failed to create Azure OpenAI client")?;
    let store = PgVectorStore::new(&config.store);

    info!(
        model = %embedder.model(),
        deployment = %backend.deployment(),
        workspace = %config.retrieval.workspace,
        "LightRAG chat ready"
    );

    let chat = RagChat::new(
        embedder,
        store,
        backend,
        ContextRetriever::new(config.retrieval.clone()),
        PromptAssembler::from_prompt_files(),
    );

    let mut stdout = io::stdout();
    if !query.trim().is_empty() {
        commands::run_single_shot(&chat, query.trim(), &mut stdout).await?;
        return Ok(());
    }

    let mut history = ConversationHistory::new(config.history_limit);
    let input = commands::stdin_lines();

    tokio::select! {
        result = commands::run_interactive(&chat, &mut history, input, &mut stdout) => result?,
        _ = tokio::signal::ctrl_c() => {
            writeln!(io::stdout(), "\nGoodbye.")?;
        }
    }
    Ok(())
}
