//! CLI command definitions for baseline-forge.
//!
//! Subcommands cover the whole workflow: create the schema, ingest catalog
//! problems, generate baseline solutions, and inspect model routing.

use crate::catalog::LeetCodeClient;
use crate::generation::{CodeExtractor, GenerationOrchestrator, TokioSleeper};
use crate::llm::{
    BackendKind, BackendSet, GeminiProvider, OllamaChatProvider, ProviderRouter, ResolvedModel,
};
use crate::pipeline::{BatchDriver, BatchSummary, CatalogIngestor, IngestSummary, PipelineConfig};
use crate::storage::{Database, DEFAULT_SELECT_LIMIT};
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Database used when neither `--database-url` nor `DATABASE_URL` is set.
const DEFAULT_DATABASE_URL: &str = "sqlite://baseline_forge.db?mode=rwc";

/// Baseline code generation for LeetCode challenges.
#[derive(Parser)]
#[command(name = "baseline-forge")]
#[command(about = "Ingest coding challenges and generate baseline LLM solutions")]
#[command(version)]
#[command(
    long_about = "baseline-forge stores LeetCode challenges in a relational database and asks each configured model for a Python 3 solution, retrying with exponential backoff until the answer looks like code.\n\nExample usage:\n  baseline-forge init-db --seed-models\n  baseline-forge ingest --per-difficulty 10\n  baseline-forge generate --challenge-limit 1"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Database URL (sqlite:, mysql: or postgres:).
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL, global = true)]
    pub database_url: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create the tables if they do not exist.
    InitDb(InitDbArgs),

    /// Fetch free catalog problems and store them as challenges.
    Ingest(IngestArgs),

    /// Generate baseline solutions for stored challenges x models.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Show how a logical model name is routed.
    Resolve(ResolveArgs),
}

/// Arguments for `baseline-forge init-db`.
#[derive(Parser, Debug)]
pub struct InitDbArgs {
    /// Insert the default model names (Gemini, deepseek, GPT, LLAMA).
    #[arg(long)]
    pub seed_models: bool,
}

/// Arguments for `baseline-forge ingest`.
#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// Maximum problems kept per difficulty level.
    #[arg(long)]
    pub per_difficulty: Option<usize>,

    /// Pause between statement requests in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Output the summary as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `baseline-forge generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Maximum number of challenges to process.
    #[arg(long, default_value_t = DEFAULT_SELECT_LIMIT)]
    pub challenge_limit: u64,

    /// Maximum number of models to use.
    #[arg(long, default_value_t = DEFAULT_SELECT_LIMIT)]
    pub model_limit: u64,

    /// Backend for model names that match no known family (chat or text-generation).
    #[arg(long)]
    pub fallback_backend: Option<BackendKind>,

    /// Pause between (challenge, model) pairs in milliseconds.
    #[arg(long)]
    pub pair_delay_ms: Option<u64>,

    /// Attempts per pair (overrides GENERATION_MAX_ATTEMPTS).
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Output the summary as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `baseline-forge resolve`.
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Logical model name, e.g. "GPT" or "deepseek-coder".
    pub model_name: String,

    /// Output the route as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::InitDb(args) => run_init_db_command(&cli.database_url, args).await,
        Commands::Ingest(args) => run_ingest_command(&cli.database_url, args).await,
        Commands::Generate(args) => run_generate_command(&cli.database_url, args).await,
        Commands::Resolve(args) => run_resolve_command(args),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn run_init_db_command(database_url: &str, args: InitDbArgs) -> anyhow::Result<()> {
    let mut db = Database::new(database_url)?;
    let outcome = db.initialize_schema(args.seed_models).await;
    close_database(&mut db).await;

    let seeded = outcome.context("Failed to initialize schema")?;
    println!("✓ Schema ready ({})", db.backend());
    if args.seed_models {
        println!("  Seeded model names: {}", seeded);
    }
    Ok(())
}

async fn run_ingest_command(database_url: &str, args: IngestArgs) -> anyhow::Result<()> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(limit) = args.per_difficulty {
        config = config.with_per_difficulty_limit(limit);
    }
    if let Some(ms) = args.delay_ms {
        config = config.with_catalog_request_delay(Duration::from_millis(ms));
    }
    config.validate()?;

    let catalog = LeetCodeClient::new()?.with_per_difficulty_limit(config.per_difficulty_limit);
    let ingestor = CatalogIngestor::new(Arc::new(catalog))
        .with_request_delay(config.catalog_request_delay);

    let mut db = Database::new(database_url)?;
    let summary = ingestor.run(&mut db).await;
    close_database(&mut db).await;

    print_ingest_summary(&summary, args.json)?;
    if summary.fetched == 0 {
        anyhow::bail!("Failed to obtain the problem list from the catalog");
    }
    Ok(())
}

async fn run_generate_command(database_url: &str, args: GenerateArgs) -> anyhow::Result<()> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(attempts) = args.max_attempts {
        config = config.with_max_attempts(attempts);
    }
    if let Some(ms) = args.pair_delay_ms {
        config = config.with_pair_delay(Duration::from_millis(ms));
    }
    config.validate()?;

    let backends = build_backends(&config)?;
    info!(backends = ?backends.kinds(), "Generation backends ready");

    let orchestrator = GenerationOrchestrator::new(ProviderRouter::new(), backends)
        .with_extractor(CodeExtractor::default())
        .with_rules(config.validation_rules())
        .with_retry_policy(config.retry_policy())
        .with_fallback_backend(args.fallback_backend)
        .with_sleeper(Arc::new(TokioSleeper));

    let driver = BatchDriver::new(orchestrator)
        .with_challenge_limit(args.challenge_limit)
        .with_model_limit(args.model_limit)
        .with_pair_delay(config.pair_delay);

    let mut db = Database::new(database_url)?;
    let outcome = driver.run(&mut db).await;
    close_database(&mut db).await;

    print_batch_summary(&outcome?, args.json)
}

fn run_resolve_command(args: ResolveArgs) -> anyhow::Result<()> {
    let resolved = ProviderRouter::new().resolve(&args.model_name);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    match resolved {
        ResolvedModel::Known {
            family,
            technical_id,
            backend,
        } => {
            println!("{} -> {}", args.model_name, technical_id);
            println!("  Family:  {:?}", family);
            println!("  Backend: {}", backend);
        }
        ResolvedModel::Passthrough { technical_id } => {
            println!("{} -> {} (passthrough)", args.model_name, technical_id);
            println!("  Backend: none, requires --fallback-backend");
        }
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Build the backend set from configuration.
///
/// The chat backend is always available; the text-generation backend
/// needs `GEMINI_API_KEY`.
fn build_backends(config: &PipelineConfig) -> anyhow::Result<BackendSet> {
    let ollama = OllamaChatProvider::with_timeout(&config.ollama_host, config.request_timeout)
        .context("Failed to create Ollama client")?;
    let mut backends = BackendSet::new().with_backend(BackendKind::Chat, Arc::new(ollama));

    match config.gemini_api_key.as_deref() {
        Some(key) => {
            let gemini =
                GeminiProvider::with_base_url(key, &config.gemini_api_base, config.request_timeout)
                    .context("Failed to create Gemini client")?;
            info!(api_key = %gemini.api_key_masked(), "Gemini backend enabled");
            backends = backends.with_backend(BackendKind::TextGeneration, Arc::new(gemini));
        }
        None => {
            warn!("GEMINI_API_KEY not set, Gemini models will fail every attempt");
        }
    }

    Ok(backends)
}

async fn close_database(db: &mut Database) {
    if let Err(e) = db.close().await {
        warn!(error = %e, "Failed to close database connection");
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json_output =
        serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json_output);
    Ok(())
}

fn print_ingest_summary(summary: &IngestSummary, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(summary);
    }

    println!("✓ Catalog ingestion completed");
    println!("  Fetched: {}", summary.fetched);
    println!("  Stored:  {}", summary.stored);
    println!("  Failed:  {}", summary.failed);
    Ok(())
}

fn print_batch_summary(summary: &BatchSummary, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(summary);
    }

    println!("✓ Baseline generation completed");
    println!("  Run ID:               {}", summary.run_id);
    println!("  Pairs:                {}", summary.pairs);
    println!("  Stored:               {}", summary.succeeded);
    println!("  Generation failures:  {}", summary.generation_failures);
    println!("  Persistence failures: {}", summary.persistence_failures);
    println!(
        "  Duration:             {:.1}s",
        summary.duration().num_milliseconds() as f64 / 1000.0
    );
    Ok(())
}
