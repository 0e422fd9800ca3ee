//! The rotation daemon: wires a schedule document into a player instance
//! and runs until interrupted.
//!
//! The rendering surface is represented by a logging play-url handler;
//! a real deployment replaces it with the display integration.

use std::path::Path;
use std::sync::Arc;

use miette::Result;
use serde_json::Value;
use tokio::sync::watch;
use tracing::info;

use marquee_player::{PlayerEvent, RotationPlayer, SystemClock};

pub async fn run(schedule_path: &Path) -> Result<()> {
    let document = read_document(schedule_path)?;

    let player = Arc::new(RotationPlayer::new(Arc::new(SystemClock)));
    player.set_play_url_handler(Box::new(|reference| {
        info!(%reference, "load content");
    }));
    player.set_content(document);

    // Surface playing-item notifications the way a telemetry collaborator
    // consumes them.
    let mut events = player.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(PlayerEvent::Playing(item)) => info!(item = %item.name, "now playing"),
                Ok(PlayerEvent::NothingPlaying) => info!("nothing playing"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    });

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    player.start();
    player.run(shutdown_rx).await;
    player.stop();

    Ok(())
}

/// Read and parse a schedule document from disk.
pub fn read_document(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("failed to read schedule document {}: {}", path.display(), e))?;
    serde_json::from_str(&raw)
        .map_err(|e| miette::miette!("failed to parse schedule document: {}", e))
}
