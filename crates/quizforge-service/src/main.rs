use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use quizforge_core::TypeFilter;
use quizforge_db_memory::create_memory_source;
use quizforge_db_memory::fixtures::seed_sample_catalog;
use quizforge_db_postgres::PostgresQuizSource;
use quizforge_service::config::loader::load_config;
use quizforge_service::{AppConfig, QuizService, SourceBackend, metrics, observability};
use quizforge_storage::DynQuizSource;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "quizforge")]
#[command(about = "Inspect and manage the QuizForge aggregate cache")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file (defaults to quizforge.toml)
    #[arg(short, long, global = true, env = "QUIZFORGE_CONFIG")]
    config: Option<String>,

    /// Log filter for this run, replacing `logging.level`
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the aggregate of a quiz as JSON
    Get {
        quiz_id: String,
        /// Only include questions of this type (e.g. single_selection)
        #[arg(long = "type")]
        question_type: Option<String>,
        /// Read from the source, bypassing the cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Show cache analytics and operation latency
    Stats {
        /// Print Prometheus text format instead of JSON
        #[arg(long)]
        prometheus: bool,
    },
    /// Remove cached aggregates of one quiz, or of all quizzes
    Invalidate { quiz_id: Option<String> },
    /// Invalidate a quiz and load it again
    Refresh { quiz_id: String },
    /// Warm the cache with quizzes sharing a quiz's topic
    Prefetch {
        quiz_id: String,
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },
    /// Print the effective configuration as TOML
    PrintConfig,
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())
        .map_err(|e| anyhow!(e))
        .context("Configuration error")?;
    observability::init_tracing(&config.logging);
    if let Some(level) = cli.log_level.as_deref()
        && !observability::apply_logging_level(level)
    {
        tracing::warn!(level, "log level override ignored");
    }

    if matches!(cli.command, Commands::PrintConfig) {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }
    if matches!(cli.command, Commands::Stats { prometheus: true }) {
        metrics::init_metrics();
    }

    let source = open_source(&config).await?;
    let service = QuizService::open(&config, source).await;
    let result = execute(&service, &config, cli.command).await;
    service.close().await;
    result
}

async fn open_source(config: &AppConfig) -> Result<DynQuizSource> {
    match config.storage.backend {
        SourceBackend::Memory => {
            let source = create_memory_source();
            seed_sample_catalog(&source).context("Failed to seed in-memory catalogue")?;
            tracing::info!("using in-memory source with the sample catalogue");
            Ok(source)
        }
        SourceBackend::Postgres => {
            let source = PostgresQuizSource::new(&config.postgres)
                .await
                .context("Failed to connect to PostgreSQL")?;
            Ok(Arc::new(source))
        }
    }
}

async fn execute(service: &QuizService, config: &AppConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Get {
            quiz_id,
            question_type,
            no_cache,
        } => {
            let filter = TypeFilter::parse(question_type.as_deref().unwrap_or_default())?;
            let read = service.read_aggregate(&quiz_id, filter, !no_cache).await?;
            tracing::info!(quiz_id = %quiz_id, outcome = read.outcome.as_str(), "aggregate loaded");
            print_json(&read.quiz)?;
        }
        Commands::Stats { prometheus } => {
            if prometheus {
                service.stats().await;
                print!("{}", metrics::render_metrics().unwrap_or_default());
            } else {
                print_json(&service.stats().await)?;
            }
        }
        Commands::Invalidate { quiz_id } => {
            let removed = service.invalidate(quiz_id.as_deref()).await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::Refresh { quiz_id } => {
            print_json(&service.refresh(&quiz_id).await?)?;
        }
        Commands::Prefetch { quiz_id, limit } => {
            let warmed = service.prefetch_related(&quiz_id, limit).await;
            print_json(&serde_json::json!({ "quiz_id": quiz_id, "warmed": warmed }))?;
        }
        Commands::PrintConfig => println!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
