//! Machinery QA server
//!
//! # Usage
//!
//! ```bash
//! # Serve the API with ./qa_config.toml or built-in defaults
//! machinery-qa
//!
//! # Explicit config and bind address
//! machinery-qa --config /etc/machinery-qa/qa_config.toml --addr 0.0.0.0:8501 serve
//!
//! # Create tables and seed the sample machine, then exit
//! machinery-qa init-db
//! ```
//!
//! # Environment Variables
//!
//! - `QA_CONFIG`: Path to TOML config file
//! - `QA_SERVER_ADDR`: Bind address override
//! - `DATABASE_URL`: SQLite URL override
//! - `GROQ_API_KEY`: Assistant API key (suggestions and chat are disabled without one)
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use machinery_qa::api::{create_app, ApiState};
use machinery_qa::config::{AssistantConfig, QaConfig};
use machinery_qa::llm::{Assistant, ChatCompletionsClient, DisabledAssistant};
use machinery_qa::report::PdfReportRenderer;
use machinery_qa::service::InspectionService;
use machinery_qa::session::SessionStore;
use machinery_qa::storage::Database;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "machinery-qa")]
#[command(about = "Machinery QA inspection service")]
#[command(version)]
struct CliArgs {
    /// Path to a qa_config.toml file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the server address (default: "127.0.0.1:8501")
    #[arg(short, long)]
    addr: Option<String>,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug, Clone, Copy, Default)]
enum SubCommand {
    /// Run the HTTP API (default)
    #[default]
    Serve,
    /// Create tables and seed the sample machine, then exit
    InitDb,
    /// Print the effective configuration as TOML
    PrintConfig,
}

// ============================================================================
// Startup
// ============================================================================

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Load config under a temporary subscriber so loader warnings are visible
/// before the configured one is installed.
fn load_config(args: &CliArgs) -> Result<QaConfig> {
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .finish();
    let _guard = tracing::subscriber::set_default(bootstrap);

    let mut config = QaConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(addr) = &args.addr {
        config.server.addr.clone_from(addr);
    }
    Ok(config)
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_assistant(config: &AssistantConfig) -> Result<Arc<dyn Assistant>> {
    if !config.enabled {
        info!("Assistant disabled in configuration");
        return Ok(Arc::new(DisabledAssistant));
    }

    match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => {
            let client = ChatCompletionsClient::new(config, key)
                .context("Failed to build assistant HTTP client")?;
            info!(endpoint = client.endpoint(), model = %config.model, "Assistant enabled");
            Ok(Arc::new(client))
        }
        None => {
            warn!("No assistant API key configured (set GROQ_API_KEY); suggestions and chat are disabled");
            Ok(Arc::new(DisabledAssistant))
        }
    }
}

async fn open_database(config: &QaConfig) -> Result<Database> {
    let db = Database::connect(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    db.initialize(config.database.seed_sample_machine)
        .await
        .context("Failed to initialize database schema")?;
    Ok(db)
}

async fn serve(config: QaConfig) -> Result<()> {
    let db = open_database(&config).await?;
    let assistant = build_assistant(&config.assistant)?;
    let renderer = Arc::new(PdfReportRenderer::new(&config.report.output_dir));
    info!(dir = %renderer.output_dir().display(), "Reports directory");

    let service = InspectionService::new(db.clone(), config.auth.bcrypt_cost, assistant, renderer);
    let sessions = SessionStore::from_config(&config.server);
    let app = create_app(ApiState::with_sessions(service, sessions), &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!("HTTP server listening on http://{}", config.server.addr);

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await
        .context("HTTP server error")?;

    db.close().await;
    info!("Graceful shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_tracing(config.logging.json);

    match args.command.unwrap_or_default() {
        SubCommand::Serve => serve(config).await,
        SubCommand::InitDb => {
            let db = open_database(&config).await?;
            db.close().await;
            info!(url = %config.database.url, "Database initialized");
            Ok(())
        }
        SubCommand::PrintConfig => {
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
