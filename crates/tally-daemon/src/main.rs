// crates/tally-daemon/src/main.rs
//
// Binary entrypoint for the Tally daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, builds
// the runtime with its genesis balances, spawns the block scheduler in block
// mode, and serves the RPC API until ctrl-c.

mod config;
mod scheduler;
mod shared;

use clap::Parser;
use config::DaemonConfig;
use scheduler::BlockScheduler;
use shared::DaemonSharedState;

use tally_rpc::{RpcConfig, TallyRpcServer};

/// Tally daemon: hosts the accrual contracts behind a JSON-RPC endpoint.
#[derive(Parser, Debug)]
#[command(name = "tally-daemon", version = "0.1.0", about = "Tally accrual engine daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.tally/config.toml")]
    config: String,

    /// Clock source, overriding the config file: system or block.
    #[arg(long)]
    clock: Option<String>,

    /// RPC port, overriding the config file.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config_path = expand_tilde(&args.config);
    let loaded = DaemonConfig::load(&config_path);

    // RUST_LOG wins over the configured level.
    let fallback_level = loaded
        .as_ref()
        .map(|cfg| cfg.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback_level)),
        )
        .init();

    // Fall back to defaults if the file is missing or invalid.
    let mut daemon_config = match loaded {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", config_path);
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                config_path,
                e
            );
            DaemonConfig::default()
        }
    };

    if let Some(clock) = args.clock {
        daemon_config.clock_mode = clock;
    }
    if let Some(port) = args.port {
        daemon_config.rpc_port = port;
    }
    daemon_config.validate()?;

    tracing::info!("Tally Daemon v0.1.0");
    tracing::info!("Clock mode: {}", daemon_config.clock_mode);
    tracing::info!(
        "RPC endpoint: {}:{}",
        daemon_config.rpc_host,
        daemon_config.rpc_port
    );
    tracing::info!("Owner: {}", daemon_config.runtime.owner);

    let shared_state = DaemonSharedState::new(&daemon_config)?;

    if let Some(block_clock) = shared_state.block_clock.clone() {
        let mut scheduler = BlockScheduler::new(block_clock, daemon_config.block_time_secs);
        tokio::spawn(async move {
            if let Err(e) = scheduler.run().await {
                tracing::error!("Block scheduler error: {}", e);
            }
        });
    }

    let rpc_config = RpcConfig {
        host: daemon_config.rpc_host.clone(),
        port: daemon_config.rpc_port,
    };
    let rpc_server = TallyRpcServer::new(rpc_config, shared_state.runtime.clone())
        .with_clock(shared_state.clock.clone(), shared_state.clock_mode.clone())
        .with_start_time(shared_state.start_time);

    tokio::select! {
        result = rpc_server.start() => {
            if let Err(e) = result {
                tracing::error!("RPC server error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    tracing::info!("Tally daemon shut down gracefully");
    Ok(())
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
