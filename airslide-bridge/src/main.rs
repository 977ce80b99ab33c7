//! airslide bridge host — entry point.
//!
//! ```text
//! airslide-bridge                      Connect with config defaults
//! airslide-bridge --config <path>      Use custom config TOML
//! airslide-bridge --gen-config         Dump default config and exit
//! airslide-bridge --replay <trace>     Replay a touch trace, then exit
//! airslide-bridge --profile <json>     Overlay a sensitivity profile
//! airslide-bridge --sync               Force a resync instead of toggling
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use airslide_core::{BridgeEngine, LinkState, POLL_INTERVAL};

use airslide_bridge::config::BridgeConfig;
use airslide_bridge::profile::SensitivityProfile;
use airslide_bridge::replay::{load_trace, run_trace};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "airslide-bridge", about = "Touch-to-sensor bridge host")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "airslide.toml")]
    config: PathBuf,

    /// Peer address (overrides config). Example: 192.168.1.50
    #[arg(short, long)]
    address: Option<String>,

    /// Peer port (overrides config).
    #[arg(short, long)]
    port: Option<String>,

    /// Sensitivity profile JSON to overlay onto the config.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Touch trace to replay; the bridge exits when it completes.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Request a forced resync instead of a plain connect toggle.
    #[arg(long)]
    sync: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&BridgeConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = BridgeConfig::load(&cli.config);
    if let Some(address) = cli.address {
        config.network.address = address;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(path) = &cli.profile {
        SensitivityProfile::load(path)?.apply(&mut config);
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("airslide-bridge v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Start the engine ─────────────────────────────────────

    let protocol = config.protocol()?;
    let handle = BridgeEngine::spawn(config.transport.send_rate_hz);
    handle.configure_transport(&config.network.address, &config.network.port, protocol)?;
    info!(
        "target {}:{} ({protocol}), {} Hz",
        config.network.address, config.network.port, config.transport.send_rate_hz
    );

    // ── 2. Bring the link up ────────────────────────────────────

    if cli.sync {
        handle.request_sync()?;
    } else {
        handle.toggle_connection()?;
    }

    // ── 3. Replay mode: run the trace and exit ──────────────────

    if let Some(path) = &cli.replay {
        let events = load_trace(path)?;
        info!("replaying {} events from {}", events.len(), path.display());
        let stats = run_trace(&events, &config, &handle).await?;
        // Let the final snapshot reach the wire before tearing down.
        tokio::time::sleep(POLL_INTERVAL).await;
        info!("replay done: {} events, {} snapshots", stats.events, stats.snapshots);
        handle.shutdown();
        return Ok(());
    }

    // ── 4. Poll loop until interrupted ──────────────────────────

    let mut last = handle.link_state();
    info!("link {last}");
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = poll.tick() => {
                let state = handle.link_state();
                if state != last {
                    info!("link {last} -> {state}");
                    if state == LinkState::Suspended {
                        warn!("peer dropped the link; toggle again to reconnect");
                    }
                    last = state;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // ── 5. Shutdown ─────────────────────────────────────────────

    info!("shutting down");
    handle.shutdown();
    Ok(())
}
