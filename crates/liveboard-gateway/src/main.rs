use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod app;
mod http;
mod ws;

/// Live-update gateway: fans board and thread mutations out to
/// subscribed viewers over WebSocket.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the config file (default: ./liveboard.toml).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liveboard_gateway=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config =
        liveboard_core::LiveboardConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            liveboard_core::LiveboardConfig::default()
        });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let state = Arc::new(app::AppState::new(config));
    let router = app::build_router(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Liveboard gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
