//! Ops Copilot - CLI Entry Point

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ops_copilot::services::agent::{
    ActionKind, ActionProposal, AgentRequest, AnswerStyle, FinalState, Intent,
};
use ops_copilot::{AppConfig, AppError, AppResult, AppState};
use ops_copilot_core::streaming::AnswerStreamEvent;
use ops_copilot_retrieval::{
    load_text_documents, ChunkingOptions, IngestOptions, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP,
};

#[derive(Parser)]
#[command(name = "ops-copilot", version)]
#[command(about = "Retrieval-augmented operations copilot: cited answers and action proposals")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed, and index source documents
    Ingest {
        /// Directory of .md/.txt sources (default: RAW_DOCS_DIR)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Drop and recreate the chunk store before ingesting
        #[arg(long)]
        rebuild: bool,
        /// Chunk size (characters)
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Chunk overlap (characters)
        #[arg(long, default_value_t = DEFAULT_OVERLAP)]
        overlap: usize,
    },
    /// Query the vector index and view ranked passages
    Search {
        /// Query text
        #[arg(long = "q")]
        query: String,
        /// Number of results
        #[arg(long, default_value_t = 4)]
        k: usize,
    },
    /// Run a question or operational command through the agent pipeline
    Ask {
        /// The question or command
        query: String,
        /// Retrieval breadth
        #[arg(long, default_value_t = 4)]
        top_k: usize,
        /// Response style: detailed | concise
        #[arg(long, default_value = "detailed")]
        style: String,
        /// Sampling temperature (clamped to 0.0..=0.8)
        #[arg(long, default_value_t = 0.2)]
        temperature: f32,
        /// Stream the answer token by token (knowledge branch only)
        #[arg(long)]
        stream: bool,
        /// Print the full final state as JSON instead of formatted output
        #[arg(long)]
        json: bool,
    },
    /// Send an extracted action proposal to the ops service for execution
    Approve {
        /// Path to a proposal JSON file, or "-" for stdin
        #[arg(long)]
        proposal: PathBuf,
        /// Operator name recorded in the audit trail (default: OPERATOR_NAME)
        #[arg(long)]
        operator: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match dispatch(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Command, config: AppConfig) -> AppResult<()> {
    match command {
        Command::Ingest {
            source,
            rebuild,
            chunk_size,
            overlap,
        } => ingest(config, source, rebuild, chunk_size, overlap).await,
        Command::Search { query, k } => search(config, &query, k).await,
        Command::Ask {
            query,
            top_k,
            style,
            temperature,
            stream,
            json,
        } => ask(config, &query, top_k, &style, temperature, stream, json).await,
        Command::Approve { proposal, operator } => approve(config, &proposal, operator).await,
    }
}

async fn ingest(
    config: AppConfig,
    source: Option<PathBuf>,
    rebuild: bool,
    chunk_size: usize,
    overlap: usize,
) -> AppResult<()> {
    let source_dir = source.unwrap_or_else(|| config.raw_docs_dir.clone());
    let state = AppState::initialize(config)?;

    let documents = load_text_documents(&source_dir).map_err(AppError::Retrieval)?;
    if documents.is_empty() {
        println!(
            "No .md/.txt documents found in {}. Add files and retry.",
            source_dir.display()
        );
        return Ok(());
    }

    let options = IngestOptions {
        chunking: ChunkingOptions {
            chunk_size,
            overlap,
            ..ChunkingOptions::default()
        },
        rebuild,
    };

    let summary = state.retrieval.ingest(&documents, &options).await?;
    println!(
        "Done. Indexed {} chunks from {} documents ({} total in store).",
        summary.chunks,
        summary.documents,
        state.retrieval.chunk_count()?
    );
    Ok(())
}

async fn search(config: AppConfig, query: &str, k: usize) -> AppResult<()> {
    let state = AppState::initialize(config)?;
    let passages = state.retrieval.search(query, k).await?;

    if passages.is_empty() {
        println!("No matches. Has anything been ingested yet?");
        return Ok(());
    }

    println!("\nTop matches:");
    for (i, passage) in passages.iter().enumerate() {
        let meta = &passage.metadata;
        let title = meta.get("title").map(|s| s.as_str()).unwrap_or("");
        let src = meta.get("filename").map(|s| s.as_str()).unwrap_or("");
        let page = meta.get("page").map(|s| s.as_str()).unwrap_or("?");
        println!(
            "[{}] {} (p{}) — {} | distance={:.4}",
            i + 1,
            title,
            page,
            src,
            passage.distance
        );
        println!("    {}", snippet(&passage.document, 300));
    }
    Ok(())
}

async fn ask(
    config: AppConfig,
    query: &str,
    top_k: usize,
    style: &str,
    temperature: f32,
    stream: bool,
    json: bool,
) -> AppResult<()> {
    let style: AnswerStyle = style.parse().map_err(AppError::validation)?;
    let state = AppState::initialize(config)?;

    let request = AgentRequest::new(query)
        .with_top_k(top_k)
        .with_style(style)
        .with_temperature(temperature);
    let mut final_state = state.pipeline.run(request).await?;

    // Live display: re-synthesize over the already retrieved contexts and
    // let the accumulated text replace the pipeline's answer. The pipeline
    // itself never streams; this is the caller's concern.
    let mut streamed_live = false;
    if stream && final_state.intent == Intent::Knowledge && state.synthesizer.is_configured() {
        if let Some(contexts) = final_state.contexts().map(|c| c.to_vec()) {
            let mut rx =
                state
                    .synthesizer
                    .stream_answer(query, &contexts, style, temperature);
            let mut streamed = String::new();
            while let Some(event) = rx.recv().await {
                match event {
                    AnswerStreamEvent::TextDelta { content } => {
                        print!("{}", content);
                        let _ = std::io::stdout().flush();
                        streamed.push_str(&content);
                    }
                    AnswerStreamEvent::Error { message, .. } => {
                        eprintln!("\nstream error: {}", message);
                        break;
                    }
                    AnswerStreamEvent::Complete { .. } => break,
                    AnswerStreamEvent::Usage { .. } => {}
                }
            }
            println!();
            if !streamed.is_empty() {
                final_state.answer = streamed;
                streamed_live = true;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&final_state)?);
        return Ok(());
    }

    print_final_state(&final_state, streamed_live);
    Ok(())
}

fn print_final_state(state: &FinalState, answer_already_streamed: bool) {
    if !(answer_already_streamed && state.intent == Intent::Knowledge) {
        println!("{}", state.answer);
    }

    println!("\nDecision Log:");
    for line in &state.log {
        println!("  {}", line);
    }

    match state.intent {
        Intent::Knowledge => {
            if let Some(contexts) = state.contexts() {
                if contexts.is_empty() {
                    println!("\nNo sources retrieved.");
                } else {
                    println!("\nRetrieved Sources:");
                    for (i, passage) in contexts.iter().enumerate() {
                        let meta = &passage.metadata;
                        println!(
                            "  [{}] {} (p{}) — distance={:.4}",
                            i + 1,
                            meta.get("filename").map(|s| s.as_str()).unwrap_or(""),
                            meta.get("page").map(|s| s.as_str()).unwrap_or("?"),
                            passage.distance
                        );
                    }
                }
            }
            if state.grounded() == Some(false) {
                println!("\nNote: the answer contains no [filename pX] citation.");
            }
        }
        Intent::Action => {
            if let Some(proposal) = state.proposed_action() {
                println!("\nProposed Action:");
                match serde_json::to_string_pretty(proposal) {
                    Ok(json) => println!("{}", json),
                    Err(_) => println!("{:?}", proposal),
                }
                if proposal.kind != ActionKind::Unknown {
                    println!(
                        "\nSave the proposal JSON and run `ops-copilot approve --proposal <file>` to execute."
                    );
                }
            }
        }
    }
}

async fn approve(
    config: AppConfig,
    proposal_path: &PathBuf,
    operator: Option<String>,
) -> AppResult<()> {
    let raw = if proposal_path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(proposal_path)?
    };
    let proposal: ActionProposal = serde_json::from_str(&raw)?;

    let endpoint = match proposal.kind {
        ActionKind::PauseItem => "/pause_item",
        ActionKind::UnpauseItem => "/unpause_item",
        ActionKind::UpdateHours => "/update_hours",
        ActionKind::Unknown => {
            return Err(AppError::validation(
                "cannot approve an unknown action; rephrase the request",
            ))
        }
    };

    let operator = operator.unwrap_or_else(|| config.operator.clone());
    let mut payload = serde_json::to_value(&proposal)?;
    payload["operator"] = serde_json::Value::String(operator);

    let url = format!("{}{}", config.ops_api_url.trim_end_matches('/'), endpoint);
    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| AppError::internal(format!("ops service unreachable: {}", e)))?;

    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .unwrap_or_else(|_| serde_json::json!({}));

    if !status.is_success() {
        return Err(AppError::internal(format!(
            "action failed: HTTP {} {}",
            status.as_u16(),
            body
        )));
    }

    let message = body
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Action executed and audited.");
    println!("{}", message);
    Ok(())
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let truncated: String = flat.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
