use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use metadata_creator::{
    agents::{FileUploadAgent, MetadataAgent},
    config::Config,
    conversation::SessionRegistry,
    llm::{DatabricksAdapter, ModelGateway, WorkspaceAuth},
    prompt::SystemPrompt,
    routes::create_router,
    sampler::FileSampler,
    utils::init_logger,
    AppState,
};

#[derive(Parser)]
#[command(name = "metadata-creator", version, about = "Draft dataset metadata from file samples")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the chat server (default)
    Serve,
    /// Print the sample the model would see for a file
    Preview {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Preview { path } => preview(&config, &path).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let _log_guard = init_logger(&config.logging);
    info!("Configuration loaded: {:?}", config.server);
    info!("Serving configuration: {:?}", config.serving);

    let system_prompt = SystemPrompt::load(&config.prompt.path)
        .context("Failed to load the system prompt")?;
    info!(source = %system_prompt.source().display(), "System prompt loaded");

    let auth = WorkspaceAuth::resolve(&config.serving)
        .context("Failed to resolve Databricks workspace credentials")?;
    info!(host = auth.host(), "Databricks workspace resolved");

    let adapter = Arc::new(DatabricksAdapter::new(Arc::new(auth)));
    let gateway = ModelGateway::from_config(adapter, system_prompt, &config);
    let uploads = FileUploadAgent::new(FileSampler::from_config(&config.upload));

    let sessions = SessionRegistry::new();
    match config.session.idle_timeout() {
        Some(idle) => {
            sessions.spawn_expiry(idle);
        }
        None => info!("Session expiry disabled"),
    }

    // Create shared state
    let state = AppState {
        sessions,
        agent: Arc::new(MetadataAgent::new(uploads, Arc::new(gateway))),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn preview(config: &Config, path: &std::path::Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let sampler = FileSampler::from_config(&config.upload);
    println!("{}", sampler.preview(&filename, &bytes).text());

    Ok(())
}
