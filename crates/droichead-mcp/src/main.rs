mod auth;
mod config;
mod dispatch;
mod protocol;
mod server;
mod tools;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::Config;
use server::AppState;

#[derive(Parser, Debug)]
#[command(name = "droichead-mcp")]
struct Args {
    /// Listen port; overrides the PORT environment variable.
    #[arg(long)]
    port: Option<u16>,

    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }

    if !config.upstream_configured() {
        tracing::warn!(
            "N8N_URL / N8N_API_KEY not set; tool invocations will report the upstream as unconfigured"
        );
    }
    if !config.custom_bearer() {
        tracing::warn!("MCP_BEARER is the shipped default; set a real secret before exposing this gateway");
    }

    let addr = format!("{}:{}", args.bind, config.port);
    let state = AppState::new(config)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, tools = state.registry.len(), "gateway listening");
    axum::serve(listener, server::router(state)).await?;

    Ok(())
}
