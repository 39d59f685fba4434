//! Interactive chat loop and single-shot mode.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Instant;

use futures::{stream, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::RagChat;
use crate::history::ConversationHistory;
use crate::integrations::{ChatBackend, Embedder};
use crate::lightrag::VectorStore;
use crate::metrics;
use crate::{Error, Result};

const BANNER: &str = "\
LightRAG chat (PostgreSQL + Ollama + Azure OpenAI)
Commands: 'quit' or 'exit' to leave, 'clear' to reset the conversation";

/// What a line of user input asks the loop to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    Skip,
    Quit,
    Clear,
    Ask(String),
}

impl LoopCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return LoopCommand::Skip;
        }
        match line.to_lowercase().as_str() {
            "quit" | "exit" | "q" => LoopCommand::Quit,
            "clear" => LoopCommand::Clear,
            _ => LoopCommand::Ask(line.to_string()),
        }
    }
}

/// Stream one answer into `out`.
///
/// Returns the full reply when the turn succeeded, `None` when it ended with a
/// failure notice. Store and output errors are returned after the partial output.
pub async fn run_turn<E, S, G, W>(
    chat: &RagChat<E, S, G>,
    query: &str,
    history: &ConversationHistory,
    out: &mut W,
) -> Result<Option<String>>
where
    E: Embedder,
    S: VectorStore,
    G: ChatBackend,
    W: Write,
{
    metrics::record_turn_start();
    let start = Instant::now();

    let result = stream_turn(chat, query, history, out).await;

    let outcome = match &result {
        Ok((_, outcome)) => *outcome,
        Err(Error::Store(_)) => "store_failed",
        Err(_) => "output_failed",
    };
    metrics::record_turn_result(outcome, start.elapsed());

    let (reply, outcome) = result?;
    Ok((outcome == "ok").then_some(reply))
}

async fn stream_turn<E, S, G, W>(
    chat: &RagChat<E, S, G>,
    query: &str,
    history: &ConversationHistory,
    out: &mut W,
) -> Result<(String, &'static str)>
where
    E: Embedder,
    S: VectorStore,
    G: ChatBackend,
    W: Write,
{
    let mut stream = std::pin::pin!(chat.stream_chat(query, history.messages()));
    let mut reply = String::new();
    let mut outcome = "ok";

    while let Some(item) = stream.next().await {
        let fragment = item?;
        if let Some(failure) = fragment.failure() {
            outcome = failure.label();
        }
        let text = fragment.text();
        write!(out, "{}", text)?;
        out.flush()?;
        reply.push_str(&text);
    }
    writeln!(out)?;

    Ok((reply, outcome))
}

/// Lines of `reader`, read on a detached OS thread.
///
/// A read blocked on the terminal never holds up runtime shutdown; the thread
/// exits after its next line once the stream is dropped.
pub fn spawn_line_reader<R>(reader: R) -> impl Stream<Item = io::Result<String>> + Unpin
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    thread::spawn(move || {
        for line in reader.lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
        debug!("Input reader finished");
    });

    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (line, rx))
    }))
}

/// Line stream over standard input.
pub fn stdin_lines() -> impl Stream<Item = io::Result<String>> + Unpin {
    spawn_line_reader(io::BufReader::new(io::stdin()))
}

/// Read queries line by line until a quit word or end of input.
pub async fn run_interactive<E, S, G, L, W>(
    chat: &RagChat<E, S, G>,
    history: &mut ConversationHistory,
    mut lines: L,
    out: &mut W,
) -> Result<()>
where
    E: Embedder,
    S: VectorStore,
    G: ChatBackend,
    L: Stream<Item = io::Result<String>> + Unpin,
    W: Write,
{
    writeln!(out, "{}", BANNER)?;

    loop {
        write!(out, "\nYou: ")?;
        out.flush()?;

        let Some(line) = lines.next().await.transpose()? else {
            writeln!(out)?;
            break;
        };

        match LoopCommand::parse(&line) {
            LoopCommand::Skip => continue,
            LoopCommand::Quit => break,
            LoopCommand::Clear => {
                history.clear();
                writeln!(out, "Conversation history cleared.")?;
            }
            LoopCommand::Ask(query) => {
                write!(out, "\nAssistant: ")?;
                out.flush()?;

                match run_turn(chat, &query, history, out).await {
                    Ok(Some(reply)) => history.record_exchange(query, reply),
                    Ok(None) => info!("Turn failed, history unchanged"),
                    Err(err) => {
                        warn!("Turn failed: {}", err);
                        writeln!(out, "\nError: {}", err)?;
                    }
                }
            }
        }
    }

    writeln!(out, "Goodbye.")?;
    Ok(())
}

/// Answer one query with an empty history.
pub async fn run_single_shot<E, S, G, W>(chat: &RagChat<E, S, G>, query: &str, out: &mut W) -> Result<()>
where
    E: Embedder,
    S: VectorStore,
    G: ChatBackend,
    W: Write,
{
    writeln!(out, "Question: {}\n", query)?;
    write!(out, "Answer: ")?;
    out.flush()?;

    run_turn(chat, query, &ConversationHistory::default(), out).await?;
    Ok(())
}
