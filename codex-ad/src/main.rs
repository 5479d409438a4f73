//! Audio Director (codex-ad) - Main entry point
//!
//! Headless run of the Codex audio director: loads the track catalog
//! from configuration, wires the silent playback backend and the
//! command bus, then walks the catalog as a sequence of scene signals
//! with a skip and a manual override at the end. Useful for smoke
//! testing the full Director lifecycle without an output device.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use codex_ad::playback::SilentBackend;
use codex_ad::{Config, Director};
use codex_common::{AudioCommand, CommandBus, SceneSignal, TrackCatalog};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for codex-ad
#[derive(Parser, Debug)]
#[command(name = "codex-ad")]
#[command(about = "Audio Director for the Codex narrative experience")]
#[command(version)]
struct Args {
    /// Configuration file (TOML) with the track catalog
    #[arg(short, long, env = "CODEX_AD_CONFIG")]
    config: Option<PathBuf>,

    /// Dwell time per scene in milliseconds
    #[arg(long, default_value = "3000")]
    dwell_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codex_ad=debug,codex_common=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if config.tracks.is_empty() {
        anyhow::bail!("configuration contains no tracks; nothing to direct");
    }

    let catalog = TrackCatalog::new(config.tracks.clone());
    let backend = Arc::new(SilentBackend::new());
    let bus = CommandBus::default();
    let director = Director::new(catalog.clone(), backend, &bus, &config);

    // Mirror director events into the log.
    let mut events = director.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(event = event.event_type(), "director event");
        }
    });

    let dwell = Duration::from_millis(args.dwell_ms);

    // First playback requires a user gesture; the toggle stands in for it.
    director.toggle_play_pause().await;

    // Walk the catalog as if the reader scrolled through the scenes.
    for (index, track) in catalog.iter().enumerate() {
        director
            .on_scene_signal(SceneSignal {
                scene_id: format!("scene-{index}"),
                track_id: track.id.clone(),
                intensity: 0.4 + 0.1 * (index % 5) as f32,
                stinger: None,
            })
            .await;
        tokio::time::sleep(dwell).await;
    }

    director.skip_to_next().await;
    tokio::time::sleep(dwell).await;

    // A manual override through the bus, as a hidden-clue click would do.
    bus.publish(AudioCommand::Track {
        track_id: catalog.first().map(|track| track.id.clone()),
        src: None,
        label: None,
        intensity: 0.7,
    });
    tokio::time::sleep(dwell).await;

    let status = director.status().await;
    info!(?status, "final transport status");

    director.shutdown().await;
    Ok(())
}
