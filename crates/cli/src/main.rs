//! SEC GraphRAG CLI
//!
//! Serves the chains over HTTP, and runs them one-off from the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use sec_graphrag_agents::{
    ChainDeps, ChainRegistry, ChatClient, Embedder, EmbeddingClient, LlmSettings, QaChain, QaStyle,
    Text2CypherChain,
};
use sec_graphrag_core::{ChainInput, DashboardContext, RetrievalMode};
use sec_graphrag_db::{GraphRepository, Neo4jClient};
use sec_graphrag_server::{Server, ServerConfig};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// SEC GraphRAG - vector and graph retrieval over SEC filings
#[derive(Parser)]
#[command(name = "sec-graphrag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the chains and the dashboard over HTTP
    Serve {
        #[command(flatten)]
        config: ServerConfig,
    },

    /// Answer a question from retrieved context
    Ask {
        question: String,

        /// Skip graph fact expansion
        #[arg(long)]
        vector_only: bool,

        /// Print the answer once complete instead of token by token
        #[arg(long)]
        no_stream: bool,
    },

    /// Show the context a question would be answered from
    Context {
        question: String,

        /// Skip graph fact expansion
        #[arg(long)]
        vector_only: bool,
    },

    /// Answer a question by generating and running Cypher
    Cypher {
        question: String,

        /// Also print the generated query
        #[arg(long)]
        show_query: bool,
    },

    /// Show graph statistics
    Stats,

    /// Check that Neo4j and the inference services are reachable
    Health,

    /// Show the embedding dimension from the active embeddings provider
    EmbeddingDim {
        /// Optional text to embed (defaults to "dimension probe")
        text: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve { config } => cmd_serve(config).await?,
        Commands::Ask {
            question,
            vector_only,
            no_stream,
        } => cmd_ask(question, mode(vector_only), !no_stream).await?,
        Commands::Context {
            question,
            vector_only,
        } => cmd_context(question, mode(vector_only)).await?,
        Commands::Cypher {
            question,
            show_query,
        } => cmd_cypher(question, show_query).await?,
        Commands::Stats => cmd_stats().await?,
        Commands::Health => cmd_health().await?,
        Commands::EmbeddingDim { text } => cmd_embedding_dim(text).await?,
    }

    Ok(())
}

fn mode(vector_only: bool) -> RetrievalMode {
    if vector_only {
        RetrievalMode::VectorOnly
    } else {
        RetrievalMode::Graph
    }
}

fn chain_deps() -> Result<ChainDeps> {
    ChainDeps::from_env().context("Failed to configure Neo4j and inference clients")
}

async fn cmd_serve(config: ServerConfig) -> Result<()> {
    let registry = ChainRegistry::standard(chain_deps()?);
    info!("Serving {} chains on {}", registry.len(), config.address);

    Server::new(config, registry)
        .run()
        .await
        .context("Server stopped with an error")?;
    Ok(())
}

async fn cmd_ask(question: String, mode: RetrievalMode, stream: bool) -> Result<()> {
    let chain = QaChain::new(chain_deps()?, mode, QaStyle::Completion);
    let input = ChainInput::question(question);

    if !stream {
        println!("{}", chain.invoke(&input).await?);
        return Ok(());
    }

    let mut tokens = chain.stream(&input).await?;
    let mut stdout = io::stdout();
    while let Some(token) = tokens.next().await {
        write!(stdout, "{}", token?)?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}

async fn cmd_context(question: String, mode: RetrievalMode) -> Result<()> {
    let chain = QaChain::new(chain_deps()?, mode, QaStyle::Completion);
    let context = chain.retrieve(&ChainInput::question(question)).await?;

    println!("{}", DashboardContext::from_context(&context).to_pretty()?);
    Ok(())
}

async fn cmd_cypher(question: String, show_query: bool) -> Result<()> {
    let chain = Text2CypherChain::new(chain_deps()?);
    let answer = chain.answer(&ChainInput::question(question)).await?;

    if show_query {
        println!("Query:\n{}\n", answer.cypher);
    }
    println!("{}", answer.answer);
    Ok(())
}

async fn cmd_stats() -> Result<()> {
    let client = Neo4jClient::from_env().context("Failed to configure Neo4j")?;
    let stats = GraphRepository::new(Arc::new(client)).stats().await?;

    println!("Graph Statistics:");
    println!("  • Companies: {}", stats.companies);
    println!("  • Managers: {}", stats.managers);
    println!("  • Documents: {}", stats.documents);
    println!("  • Nodes: {}", stats.nodes);
    println!("  • Relationships: {}", stats.relationships);

    Ok(())
}

async fn cmd_health() -> Result<()> {
    let mut all_ok = true;

    let neo4j = Neo4jClient::from_env().context("Failed to configure Neo4j")?;
    all_ok &= report("Neo4j", neo4j.endpoint(), neo4j.health().await.unwrap_or(false));

    let embeddings = EmbeddingClient::from_env().context("Failed to configure embeddings")?;
    all_ok &= report(
        "Embeddings",
        embeddings.base_url(),
        embeddings.health().await.unwrap_or(false),
    );

    let settings = LlmSettings::from_env();
    let chat = ChatClient::answer_model(&settings).context("Failed to configure chat model")?;
    all_ok &= report(chat.model(), &settings.base_url, chat.health().await.unwrap_or(false));

    if !all_ok {
        anyhow::bail!("One or more services are unavailable");
    }
    Ok(())
}

fn report(name: &str, url: &str, ok: bool) -> bool {
    let mark = if ok { "✓" } else { "✗" };
    println!("{} {}: {}", mark, name, url);
    ok
}

async fn cmd_embedding_dim(text: Option<String>) -> Result<()> {
    let embeddings = EmbeddingClient::from_env().context("Failed to configure embeddings")?;
    if !embeddings.health().await.unwrap_or(false) {
        eprintln!("Error: embeddings service is not reachable.");
        eprintln!("  Embeddings: {}", embeddings.base_url());
        anyhow::bail!("Embeddings service unavailable");
    }

    let probe = text.unwrap_or_else(|| "dimension probe".to_string());
    let embedding = embeddings.embed(&probe).await?;
    println!("Embedding dimension: {}", embedding.len());
    Ok(())
}
