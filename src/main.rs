use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use sqlwiki::handlers::app;
use sqlwiki::logger::Logger;
use sqlwiki::{store, AppState, Config, TemplateComponent, WikiError};

/// Serve the wiki
#[derive(Debug, Parser)]
#[command(name = "sqlwiki", version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Bind address, overriding `listen` from the configuration
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), WikiError> {
    let args = Args::parse();
    if let Err(e) = Logger::init() {
        eprintln!("failed to install logger: {}", e);
    }

    let mut config = Config::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    let addr = config.socket_addr()?;
    let templates = TemplateComponent::load(config.template_dir.as_deref())?;

    let store = store::connect(&config).await?;
    log::info!("Connection successful ({:?} backend)", config.backend);
    if config.create_schema {
        if let Err(e) = store.create_schema().await {
            store.close().await;
            return Err(e.into());
        }
        log::info!("Ensured pages table exists");
    }

    let served = serve(addr, AppState::new(store.clone(), templates)).await;
    store.close().await;
    log::info!("Store connections closed");
    served
}

async fn serve(addr: std::net::SocketAddr, state: AppState) -> Result<(), WikiError> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Wiki listening on http://{}", addr);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(WikiError::from)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutdown requested"),
        Err(e) => {
            log::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}
