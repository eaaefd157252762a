//! Irrigator — Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  axum router ──▶ Dispatcher          CdevGpio / SimGpio        │
//! │  (HTTP)          (path → plant)      (GpioPort)                │
//! │                                      LogEventSink (EventSink)  │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ActivationQueue ──▶ ActivationSerializer ──▶ Registry │    │
//! │  │  (one slot)          (worker thread)          (lines)  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::info;

use irrigator::adapters::http;
use irrigator::adapters::log_sink::LogEventSink;
use irrigator::adapters::sim::SimBench;
use irrigator::app::dispatcher::Dispatcher;
use irrigator::app::ports::GpioPort;
use irrigator::app::queue::ActivationQueue;
use irrigator::app::serializer::{ActivationSerializer, Shutdown};
use irrigator::config::{DEFAULT_CONFIG_PATH, IrrigationConfig};
use irrigator::drivers::registry::LineRegistry;

/// HTTP-triggered pump and valve relay controller.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Rig description (pump, plants, listener).
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured listen address.
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Drive an in-memory bench instead of GPIO hardware.
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    info!("Irrigator v{}", env!("CARGO_PKG_VERSION"));

    let mut config = IrrigationConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    info!(
        "Config: pump {} + {} plant(s)",
        config.pump.gpio,
        config.plants.len()
    );

    if cli.simulate {
        info!("Running against the simulated bench");
        return run(SimBench::new().gpio(), config).await;
    }

    #[cfg(feature = "cdev")]
    {
        run(irrigator::adapters::cdev::CdevGpio::new(), config).await
    }
    #[cfg(not(feature = "cdev"))]
    {
        Err(anyhow!("built without GPIO support; rerun with --simulate"))
    }
}

async fn run<G>(mut gpio: G, config: IrrigationConfig) -> Result<()>
where
    G: GpioPort + 'static,
    G::Chip: Send,
    G::Line: Send,
{
    // ── 1. Acquire every line (fatal on failure) ──────────────
    let registry = LineRegistry::open(&mut gpio, &config).context("arming relay lines")?;

    // ── 2. Start the activation worker ────────────────────────
    let queue = Arc::new(ActivationQueue::new());
    let shutdown = Arc::new(Shutdown::new());
    let worker = ActivationSerializer::new(
        registry,
        Arc::clone(&queue),
        Arc::clone(&shutdown),
        LogEventSink::new(),
    )
    .spawn()
    .context("starting activation worker")?;

    // ── 3. Serve HTTP until Ctrl-C ────────────────────────────
    let dispatcher = Arc::new(Dispatcher::new(&config, queue));
    for path in dispatcher.paths() {
        info!("Route: POST {path}");
    }
    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("binding {}", config.server.listen))?;
    info!("Listening on {}", config.server.listen);

    http::serve(listener, http::router(dispatcher), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Ctrl-C handler failed: {e}");
        }
        info!("Shutdown requested");
    })
    .await
    .context("HTTP server")?;

    // ── 4. Stop the worker; it drives every line inactive ─────
    shutdown.signal(());
    tokio::task::spawn_blocking(move || worker.join())
        .await
        .context("joining activation worker")?
        .map_err(|_| anyhow!("activation worker panicked"))?;

    info!("Stopped");
    Ok(())
}
