//! Marga - Mission control for autonomous mowers
//!
//! Runs one named mission against the simulated robot and prints mission
//! lifecycle events as JSON lines on stdout. Logs go to stderr.
//!
//! ```text
//! marga --list
//! marga --config marga.toml --mission Mowing
//! RUST_LOG=marga=debug marga --mission Turns
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::filter::{Directive, EnvFilter};

use marga::config::MargaConfig;
use marga::error::{MargaError, Result};
use marga::mission::{
    Mission, MissionCommand, MissionControl, MissionRunner, RobotContext, MISSIONS,
};
use marga::sim::SimulatedRobot;

const DEFAULT_CONFIG: &str = "marga.toml";

/// Run a mission on the simulated robot
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (default: marga.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mission to run
    #[arg(short, long, default_value = "RectangleLoop")]
    mission: String,

    /// List the available missions and exit
    #[arg(long)]
    list: bool,
}

fn load_config(path: Option<&Path>) -> Result<MargaConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            MargaConfig::load(path)
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG);
            MargaConfig::load(Path::new(DEFAULT_CONFIG))
        }
        None => {
            info!("Using default configuration");
            Ok(MargaConfig::default())
        }
    }
}

fn main() -> Result<()> {
    let directive: Directive = "marga=info"
        .parse()
        .map_err(|e| MargaError::Config(format!("log directive: {e}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list {
        for name in MISSIONS {
            println!("{name}");
        }
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;
    info!("Marga v{}", env!("CARGO_PKG_VERSION"));

    let context = Arc::new(RobotContext::new());
    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let (pose_tx, pose_rx) = crossbeam_channel::unbounded();
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<Mission>();

    let shutdown = Arc::new(AtomicBool::new(false));
    let robot = SimulatedRobot::new(&config, Arc::clone(&context), command_rx, pose_tx);
    let robot_handle = robot.spawn(Arc::clone(&shutdown))?;

    let fence = Arc::new(config.site.fence()?);
    let runner = MissionRunner::new(Arc::clone(&context), command_tx, event_tx, config.runner)
        .with_geofence(fence, config.geofence);
    let mut missions = MissionControl::new(runner, pose_rx, config);

    let started = missions.handle(MissionCommand::Start {
        name: args.mission.clone(),
    });
    if let Err(e) = started {
        shutdown.store(true, Ordering::Release);
        return Err(e);
    }

    for event in event_rx.iter() {
        match event.to_json() {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to encode mission event: {}", e),
        }
        if !event.is_running() {
            break;
        }
    }

    let result = missions.wait();
    shutdown.store(true, Ordering::Release);
    if let Err(e) = robot_handle.join() {
        error!("Simulation thread panicked: {:?}", e);
    }

    match result {
        Some(mission) => info!("Mission {} finished: {:?}", mission.name, mission.status),
        None => warn!("Mission result unavailable"),
    }
    Ok(())
}
