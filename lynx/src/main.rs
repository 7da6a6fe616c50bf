mod api;
mod backend;
mod config;
mod error;
mod models;
mod normalize;
mod render;
mod sanitize;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{create_router, AppState};
use crate::backend::{EmbeddedOcrEngine, OcrGateway, RemoteOcrClient};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "lynx")]
#[command(about = "Self-hostable OCR gateway fronting heterogeneous OCR engines")]
struct Args {
    /// Bind host, overriding LYNX_HOST
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overriding LYNX_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Skip embedded engine initialization even when enabled in config
    #[arg(long)]
    no_embedded: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lynx=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!(endpoint = %config.remote.endpoint, "initializing remote OCR adapter");
    let remote = RemoteOcrClient::new(&config.remote)?;

    let embedded = if config.embedded.enabled && !args.no_embedded {
        tracing::info!(
            languages = %config.embedded.languages,
            "initializing embedded OCR engine"
        );
        match EmbeddedOcrEngine::new(&config.embedded) {
            Ok(engine) => Some(engine),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "embedded engine unavailable - requests selecting it will fail"
                );
                None
            }
        }
    } else {
        tracing::info!("embedded OCR engine disabled");
        None
    };

    let gateway = OcrGateway::new(remote, embedded, &config);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, gateway);
    let app = create_router(state);

    tracing::info!("Lynx starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  OpenAPI spec: http://{}/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
