//! Hydra control-plane server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use hydra_core::tracing_init::init_tracing;

use hydra_server::auth::{AuthGateway, ChallengeStore, JwtManager};
use hydra_server::engines::EngineService;
use hydra_server::hub::{DEFAULT_QUEUE_CAPACITY, RealtimeHub};
use hydra_server::server::{AppState, HeartbeatSettings, build_router};
use hydra_server::storage::ControlDatabase;

/// Interval for the background sweep of expired wallet challenges.
const CHALLENGE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "hydra-server", about = "Hydra trading platform control plane")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "HYDRA_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Path to the SQLite database file.
    #[arg(long, env = "HYDRA_DB_PATH", default_value = "hydra.db")]
    db_path: PathBuf,

    /// Secret for signing session tokens.
    #[arg(long, env = "HYDRA_JWT_SECRET")]
    jwt_secret: String,

    /// Access token lifetime in seconds.
    #[arg(long, env = "HYDRA_ACCESS_TTL", default_value_t = 3600)]
    access_ttl_secs: i64,

    /// Refresh token lifetime in seconds.
    #[arg(long, env = "HYDRA_REFRESH_TTL", default_value_t = 30 * 86_400)]
    refresh_ttl_secs: i64,

    /// Wallet challenge lifetime in seconds.
    #[arg(long, env = "HYDRA_CHALLENGE_TTL", default_value_t = 300)]
    challenge_ttl_secs: i64,

    /// Seconds between WebSocket heartbeat pings.
    #[arg(long, env = "HYDRA_HEARTBEAT_INTERVAL", default_value_t = 30)]
    heartbeat_interval_secs: u64,

    /// Consecutive missed pongs before a connection is evicted.
    #[arg(long, env = "HYDRA_MISSED_HEARTBEATS_MAX", default_value_t = 2)]
    missed_heartbeats_max: u32,

    /// Bound of each connection's outbound frame queue.
    #[arg(long, env = "HYDRA_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Emit logs as JSON.
    #[arg(long, env = "HYDRA_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("hydra_server=info,hydra_core=info", args.log_json);

    let db = ControlDatabase::open(&args.db_path)
        .await
        .context("opening control database")?;
    let seeded = db.seed_default_engines().await?;
    if seeded > 0 {
        info!(seeded, "Seeded stock engines");
    }

    let jwt = Arc::new(JwtManager::new(
        args.jwt_secret.as_bytes(),
        args.access_ttl_secs,
        args.refresh_ttl_secs,
    ));
    let challenges = Arc::new(ChallengeStore::new(args.challenge_ttl_secs));
    let state = AppState {
        gateway: Arc::new(AuthGateway::new(
            db.clone(),
            jwt,
            Arc::clone(&challenges),
        )),
        engines: Arc::new(EngineService::new(db)),
        hub: Arc::new(RealtimeHub::new(args.queue_capacity)),
        heartbeat: HeartbeatSettings {
            interval: Duration::from_secs(args.heartbeat_interval_secs),
            missed_max: args.missed_heartbeats_max,
        },
    };

    tokio::spawn(purge_challenges(challenges));

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("binding {}", args.addr))?;
    info!(addr = %args.addr, "Hydra control plane listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    info!("Shutdown complete");
    Ok(())
}

async fn purge_challenges(challenges: Arc<ChallengeStore>) {
    let mut interval = tokio::time::interval(CHALLENGE_PURGE_INTERVAL);
    loop {
        interval.tick().await;
        challenges.purge_expired().await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
