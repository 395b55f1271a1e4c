use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use meditalks_core::{Config, Pipeline, config_file};
use meditalks_pdf::PdfExtractBackend;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod handlers;
mod models;
mod routes;
mod state;
mod upload;

use state::AppState;

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_MAX_UPLOAD_MB: usize = 10;
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("meditalks=info")),
        )
        .with(fmt::layer().with_target(false).compact())
        .init();

    let file = config_file::load_config();
    let mut config = Config::default();
    config_file::apply_file(&mut config, &file);
    config_file::apply_env(&mut config, |name| std::env::var(name).ok());

    let server = file.server.unwrap_or_default();
    let port = match std::env::var("PORT") {
        Ok(p) => p
            .trim()
            .parse()
            .with_context(|| format!("invalid PORT value {p:?}"))?,
        Err(_) => server.port.unwrap_or(DEFAULT_PORT),
    };
    let max_upload_mb = server.max_upload_mb.unwrap_or(DEFAULT_MAX_UPLOAD_MB);

    let pipeline = Pipeline::from_config(&config, Arc::new(PdfExtractBackend))
        .context("failed to build HTTP client")?;
    match pipeline.orchestrator().primary_name() {
        Some(primary) => info!(
            primary,
            backends = pipeline.orchestrator().backends().len(),
            "AI backends configured"
        ),
        None => warn!(
            route = routes::GENERATE_PATH,
            "no AI backend keys configured; adaptation will serve offline text"
        ),
    }

    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState {
        pipeline,
        shutdown: shutdown.clone(),
        health_timeout: HEALTH_TIMEOUT,
    });
    let app = routes::router(state, max_upload_mb * 1024 * 1024);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutting down");
            }
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
