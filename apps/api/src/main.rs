mod cli;
mod config;
mod db;
mod discovery;
mod errors;
mod intake;
mod knowledge;
mod llm_client;
mod records;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::discovery::analyzer::TextAnalyzer;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::session::{MemorySessionStore, RedisSessionStore, SessionStore};
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "discovery")]
#[command(about = "ML workload discovery service", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP service (default).
    Serve,
    /// Verify credentials, sample scenarios and database connectivity.
    Check {
        /// Start the service after a clean run.
        #[arg(long)]
        serve: bool,
    },
    /// Split, summarize and load reference documents into reference_knowledge.
    LoadReference {
        /// Customer success stories (.txt or .pdf).
        #[arg(long)]
        stories: Option<PathBuf>,
        /// AE training material (.txt or .pdf).
        #[arg(long)]
        training: Option<PathBuf>,
        /// Prepare sections without touching the database.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {e:#}");
            eprintln!("   Copy apps/api/.env.example to .env and set ANTHROPIC_API_KEY.");
            std::process::exit(1);
        }
    };

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Check { serve: then_serve } => {
            let analyzer = build_analyzer(&config)?;
            let report = cli::check::run_checks(&config, &analyzer).await;
            print!("{}", report.render());
            if !report.all_passed() {
                std::process::exit(1);
            }
            if then_serve {
                serve(config).await?;
            }
            Ok(())
        }
        Commands::LoadReference {
            stories,
            training,
            dry_run,
        } => load_reference(config, stories, training, dry_run).await,
    }
}

fn build_analyzer(config: &Config) -> Result<LlmClient> {
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.llm_model.clone(),
        config.llm_base_url.clone(),
        config.llm_timeout_secs,
    )
    .context("Failed to build LLM HTTP client")?;
    info!("LLM client initialized (model: {})", llm.model());
    Ok(llm)
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting discovery service v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL is optional; records are skipped without it
    let db = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url)
                .await
                .context("DATABASE_URL is set but PostgreSQL is unreachable")?;
            ensure_schema(&pool).await?;
            Some(pool)
        }
        None => {
            info!("DATABASE_URL not set, running without records");
            None
        }
    };

    let sessions: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisSessionStore::connect(url, config.session_ttl_secs)
                .await
                .context("REDIS_URL is set but Redis is unreachable")?,
        ),
        None => Arc::new(MemorySessionStore::new()),
    };
    info!("Session store: {}", sessions.name());

    let analyzer: Arc<dyn TextAnalyzer> = Arc::new(build_analyzer(&config)?);
    info!("Capabilities: {:?}", config.capabilities);

    let port = config.port;
    let state = AppState::new(config, db, sessions, analyzer);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn load_reference(
    config: Config,
    stories: Option<PathBuf>,
    training: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let analyzer = build_analyzer(&config)?;

    let pool = if dry_run {
        None
    } else {
        let url = config
            .database_url
            .as_deref()
            .context("load-reference needs DATABASE_URL (or pass --dry-run)")?;
        let pool = create_pool(url).await?;
        ensure_schema(&pool).await?;
        Some(pool)
    };

    let summary = knowledge::loader::load_reference(
        stories.as_deref(),
        training.as_deref(),
        &analyzer,
        pool.as_ref(),
    )
    .await?;

    println!("✅ customer_stories: {} sections", summary.customer_stories);
    println!("✅ ae_training: {} sections", summary.ae_training);
    if let Some(pool) = &pool {
        for (doc_type, count) in records::reference_counts(pool).await? {
            println!("   {doc_type}: {count} rows stored");
        }
    } else {
        println!("   dry run, database untouched");
    }
    Ok(())
}
