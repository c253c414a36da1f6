use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use dbeditor::{ApiState, EditorConfig, Store, create_router};
use tracing::info;

/// Loopback-only table editor.
#[derive(Debug, Parser)]
#[command(name = "dbeditor", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overrides the config file
    #[arg(long)]
    listen: Option<String>,

    /// sqlx connection string, overrides the config file
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    config.validate()?;

    let store = Store::connect(&config.database_url, config.max_connections).await?;
    let state = ApiState::from_config(store, &config);
    let app = create_router(state, &config.path_prefix);

    let addr: SocketAddr = config.listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Table editor listening on {}{}", addr, config.path_prefix);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
