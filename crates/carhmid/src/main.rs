mod dispatcher;
mod event_loop;
mod feed;
mod player;
mod sinks;
mod system;

use anyhow::{Context, Result};
use carhmi_core::bindings::Bindings;
use carhmi_core::config::Config;
use carhmi_core::TICK;
use clap::Parser;
use dispatcher::Dispatcher;
use event_loop::EventLoop;
use player::MpdPlayer;
use std::path::PathBuf;
use system::ShellSystem;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "carhmid", about = "In-vehicle control daemon: knob, wheel and ignition events to media and power actions")]
struct Cli {
    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
    /// Config file (defaults to the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("carhmid={level}").parse().context("log directive")?),
        )
        .init();

    info!("carhmid starting");

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading config")?;

    let bindings = Bindings::builtin();
    info!(bindings = bindings.len(), player = %config.player.address(), "bindings loaded");

    let dispatcher = Dispatcher::new(
        MpdPlayer::new(&config.player),
        ShellSystem::new(&config.system),
        bindings,
        event_loop::now(),
    );
    let mut event_loop = EventLoop::new(dispatcher, TICK);

    // Event channel from the feed subscriber
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let endpoint = config.feed.resolved_endpoint();
    tokio::spawn(async move {
        if let Err(e) = feed::subscribe(endpoint, event_tx).await {
            error!(error = %e, "feed task failed");
        }
    });

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    tokio::select! {
        result = event_loop.run(&mut event_rx) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
        _ = sigterm.recv() => {
            info!("terminated");
        }
    }

    let dispatcher = event_loop.dispatcher();
    info!(
        mode = %dispatcher.mode(),
        powered = dispatcher.is_powered(),
        shutting_down = dispatcher.is_shutting_down(),
        "carhmid exiting"
    );
    Ok(())
}
