mod config;

use agentlog_gateway::JournalServer;
use agentlog_session::{normalize_task_name, FileDocumentStore, JournalService};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentlog", about = "agentlog: session-scoped event journal for agent runs")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "agentlog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ingestion server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print a persisted document
    Show {
        #[arg(value_enum)]
        document: ShowTarget,
    },
    /// Print the normalized form of a task name
    Normalize {
        /// Task name as a producer would declare it
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShowTarget {
    /// The live buffer
    Events,
    /// The archive
    SavedEvents,
    /// The task counter table
    TaskCounts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize { name } => {
            println!("{}", normalize_task_name(&name));
        }
        Commands::Show { document } => {
            let config = config::load_config(&cli.config)?;
            let journal = open_journal(config.data_dir).await?;
            let json = match document {
                ShowTarget::Events => serde_json::to_string_pretty(&journal.live_events().await?)?,
                ShowTarget::SavedEvents => {
                    serde_json::to_string_pretty(&journal.archived_events().await?)?
                }
                ShowTarget::TaskCounts => {
                    serde_json::to_string_pretty(&journal.task_counters().await?)?
                }
            };
            println!("{json}");
        }
        Commands::Serve { host, port } => {
            let config = config::load_config(&cli.config)?;
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            info!(data_dir = %config.data_dir.display(), "Opening journal");
            let journal = Arc::new(open_journal(config.data_dir).await?);
            let app = JournalServer::build_with_body_limit(journal, config.server.max_body_bytes);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("agentlog listening on {addr}");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn open_journal(data_dir: PathBuf) -> anyhow::Result<JournalService> {
    let store = FileDocumentStore::new(data_dir).await?;
    Ok(JournalService::new(Arc::new(store)))
}
