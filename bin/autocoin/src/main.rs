use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, EventSink};
use engine::{EngineController, UpbitClient};
use journal::{Journal, DEFAULT_CHANNEL_CAPACITY};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("failed to load configuration")?;
    info!(
        market = %cfg.engine.market,
        paper_mode = cfg.engine.paper_mode,
        interval = ?cfg.engine.poll_interval,
        "Autocoin starting"
    );

    // ── Journal ───────────────────────────────────────────────────────────────
    let journal = Journal::connect(&cfg.database_url)
        .await
        .with_context(|| format!("failed to open journal at {}", cfg.database_url))?;
    let (sink, writer) = journal.channel(DEFAULT_CHANNEL_CAPACITY);
    let writer_task = tokio::spawn(writer.run());

    // ── Engine ────────────────────────────────────────────────────────────────
    let source = UpbitClient::new(&cfg.upbit_base_url, cfg.fetch_timeout)
        .context("failed to build Upbit client")?;
    let strategy = strategy::build_strategy(&cfg.strategy)?;
    let sink: Arc<dyn EventSink> = Arc::new(sink);
    let engine = Arc::new(EngineController::new(
        cfg.engine.clone(),
        Arc::new(source),
        strategy,
        sink,
    ));

    // ── HTTP ──────────────────────────────────────────────────────────────────
    let host: IpAddr = cfg
        .app_host
        .parse()
        .with_context(|| format!("APP_HOST '{}' is not an IP address", cfg.app_host))?;
    let addr = SocketAddr::new(host, cfg.app_port);
    let state = api::AppState {
        engine: engine.clone(),
        journal: Some(journal),
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received.");
    };
    api::serve(state, addr, shutdown).await?;

    // ── Teardown ─────────────────────────────────────────────────────────────
    let snapshot = engine.stop().await;
    info!(status = %snapshot.status, iteration = snapshot.iteration, "Engine stopped");

    // The engine holds the last sink; dropping it lets the writer drain.
    drop(engine);
    if let Err(e) = writer_task.await {
        warn!(error = %e, "Journal writer did not finish cleanly");
    }
    info!("Exiting.");
    Ok(())
}
