//! Posepad - Main entry point
//!
//! Opens a map view with the pose publisher overlay. Long-press on the map,
//! drag to aim, and release to publish a goal pose.

mod app;
mod config;
mod input;
mod render;
mod ui;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "posepad")]
#[command(about = "Map viewer for placing and publishing goal poses")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "posepad.toml")]
    config: PathBuf,

    /// Topic to publish poses on
    #[arg(short, long)]
    topic: Option<String>,

    /// Frame published poses are expressed in
    #[arg(short, long)]
    fixed_frame: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file and exit
    #[arg(long)]
    init: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Posepad v{}", env!("CARGO_PKG_VERSION"));

    if args.init {
        config::save_default_config(&args.config)?;
        info!(path = %args.config.display(), "Wrote default configuration");
        return Ok(());
    }

    let mut config = config::load_config(&args.config)?;

    if let Some(topic) = args.topic {
        config.layer.topic = topic;
    }
    if let Some(frame) = args.fixed_frame {
        config.camera.fixed_frame = frame;
    }

    info!(
        topic = %config.layer.topic,
        fixed_frame = %config.camera.fixed_frame,
        node = %config.viewer.node_name,
        "Configuration loaded"
    );

    app::run(config)
}
