use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use callrelay_gateway::{ServerConfig, TwilioClient, routes, state::AppState};

/// Call relay gateway - connects phone calls to a realtime speech-AI agent
#[derive(Parser, Debug)]
#[command(name = "callrelay-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Place one outbound call answered by an agent
    Call {
        /// Destination phone number (E.164)
        #[arg(long = "to", value_name = "NUMBER")]
        to: String,

        /// Agent id; the configured default agent when omitted
        #[arg(long = "agent", value_name = "ID")]
        agent: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callrelay_gateway=info,tower_http=info".into()),
        )
        .init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = &cli.config {
        info!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(config_path)
            .map_err(|e| anyhow!("Failed to load {}: {}", config_path.display(), e))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    if let Some(Commands::Call { to, agent }) = cli.command {
        return place_call(&config, &to, agent.as_deref()).await;
    }

    serve(config).await
}

async fn place_call(config: &ServerConfig, to: &str, agent: Option<&str>) -> anyhow::Result<()> {
    let registry = config.agent_registry()?;
    let agent = agent.unwrap_or(registry.default_id());
    if !registry.contains(agent) {
        tracing::warn!(
            "Agent '{}' is not registered; the call will use '{}'",
            agent,
            registry.default_id()
        );
    }

    let client = TwilioClient::new(config.twilio_credentials()?)?;
    let sid = client
        .place_call(to, agent)
        .await
        .map_err(|e| anyhow!("Failed to place call to {}: {}", to, e))?;

    println!("{}", sid);
    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address();

    // Create application state
    let app_state = AppState::new(config)?;
    let app = routes::create_voice_router(app_state);

    // Parse socket address
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    let listener = TcpListener::bind(&socket_addr).await?;
    info!("Server listening on http://{}", socket_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
