use clap::Parser;
use orchestrator::{
    config::Config,
    events,
    metrics::install_prometheus_exporter,
    scheduler::Scheduler,
    wiring, SweepIntervals,
};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "orchestrator")]
#[command(about = "Track L2→L1 withdrawals and keep their status current")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Private key for signing transactions (hex string, with or without 0x prefix)
    #[arg(short = 'k', long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    init_tracing(config.json_logs);

    info!("Starting Orchestrator");
    info!("Loaded config:");
    info!("  Network: {:?}", config.network);
    info!("  Owner: {}", config.owner);
    info!("  Backend: {}", config.backend_url);
    info!("  Store: {}", config.store_path);

    install_prometheus_exporter(config.metrics_port)?;
    info!(port = config.metrics_port, "Metrics exporter listening");

    let orchestrator = wiring::build(&config, cli.private_key.as_deref()).await?;

    let intervals = SweepIntervals {
        sync: Duration::from_secs(config.intervals.sync_secs),
        probe: Duration::from_secs(config.intervals.probe_secs),
    };
    // Kept alive so the event loop runs until shutdown.
    let (_events, events_rx) = events::channel();
    let scheduler = Scheduler::new(orchestrator, intervals).spawn(events_rx);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    scheduler.shutdown().await;

    Ok(())
}
