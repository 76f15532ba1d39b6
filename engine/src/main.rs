//! handcube-replay: drive the hand interaction engine from a recording
//! or the built-in scripted session.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use handcube_engine::backend::{headless, HeadlessConfig};
use handcube_engine::config::EngineConfig;
use handcube_engine::feed::replay::{self, ReplayOptions};
use handcube_engine::feed::scenario::Scenario;
use handcube_engine::state::EngineState;

#[derive(Parser, Debug)]
#[command(name = "handcube-replay", about = "Hand-gesture interaction engine replay")]
struct Cli {
    /// JSON-lines pose recording (default: built-in demo scenario)
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Configuration plist file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame rate of the interaction loop
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Pose-model rate used to sample the demo scenario
    #[arg(long, default_value_t = 30.0)]
    feed_hz: f64,

    /// Playback speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Loop the recording
    #[arg(long = "loop")]
    looping: bool,

    /// Exit after N seconds
    #[arg(long)]
    exit_after: Option<u64>,

    /// Interval between status reports
    #[arg(long, default_value_t = 1000)]
    status_interval_ms: u64,

    /// Write status s-expressions to stdout
    #[arg(long)]
    print_status: bool,

    /// Pose pipeline restarts allowed after tracking stalls; each one
    /// reconnects the recording at the next unsent record
    #[arg(long, default_value_t = 3)]
    max_restarts: u32,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handcube_engine=info,handcube_replay=info".into()),
        )
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if cli.dump_config {
        println!("{}", config.config_sexp());
        return Ok(());
    }

    info!("handcube-replay v{} starting", env!("CARGO_PKG_VERSION"));

    let records = match &cli.replay {
        Some(path) => {
            info!("replaying {}", path.display());
            replay::load_replay(path)?
        }
        None => {
            info!("no recording given, playing the demo scenario at {}Hz", cli.feed_hz);
            Scenario::demo().record(cli.feed_hz)
        }
    };

    let options = ReplayOptions {
        speed: cli.speed,
        looping: cli.looping,
    };
    let headless = HeadlessConfig {
        fps: cli.fps,
        exit_after: cli.exit_after,
        status_interval_ms: cli.status_interval_ms,
        print_status: cli.print_status,
        max_restarts: cli.max_restarts,
        ..HeadlessConfig::default()
    };

    headless::run(EngineState::new(config), records, options, headless)
}
