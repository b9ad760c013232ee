//! LatticeLab server binary

use clap::Parser;
use latticelab::config::{Config, ATTACK_SUCCESS_RATE_DEFAULT, DATA_DIR_DEFAULT, HTTP_PORT_DEFAULT};
use latticelab::pipeline::Context;
use latticelab::store::FsStore;
use latticelab::{http, APP_NAME, APP_VERSION};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// CLI
// =============================================================================

/// LatticeLab - simulated lattice cryptography backend
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Simulated lattice cryptography backend for the LatticeCrypto desktop app")]
#[command(version)]
struct Cli {
    /// Listen address
    #[arg(long, env = "LATTICELAB_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = HTTP_PORT_DEFAULT)]
    port: u16,

    /// Data directory for result files
    #[arg(long, env = "LATTICELAB_DATA_DIR", default_value = DATA_DIR_DEFAULT)]
    data_dir: String,

    /// Multiplier for simulated delays (0 disables them)
    #[arg(long, env = "LATTICELAB_DELAY_SCALE", default_value_t = 1.0)]
    delay_scale: f64,

    /// Probability that a simulated attack recovers the key
    #[arg(long, env = "LATTICELAB_ATTACK_SUCCESS_RATE", default_value_t = ATTACK_SUCCESS_RATE_DEFAULT)]
    attack_success_rate: f64,

    /// Fixed RNG seed for reproducible results
    #[arg(long, env = "LATTICELAB_SEED")]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "info,tower_http=debug",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("LatticeLab v{}", APP_VERSION);

    // Expand data directory
    let data_dir = PathBuf::from(shellexpand::tilde(&cli.data_dir).to_string());

    let config = Config {
        bind: SocketAddr::new(cli.host, cli.port),
        data_dir,
        delay_scale: cli.delay_scale,
        attack_success_rate: cli.attack_success_rate,
        rng_seed: cli.seed,
    };
    config.validate()?;

    let store = FsStore::new();
    store.ensure_dirs(&config.paths()).await?;
    tracing::info!("Data directory: {}", config.data_dir.display());

    let bind = config.bind;
    let state = Arc::new(Context::new(config, Arc::new(store)));
    let app = http::router(state);

    tracing::info!("Starting HTTP server on {}", bind);
    tracing::info!("Health check: http://{}/api/quantum/health", bind);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
