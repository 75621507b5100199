use std::path::PathBuf;

use anyhow::{Context, Result};
use bridge_core::{Bridge, SceneMap};
use clap::Parser;
use tracing::info;

mod config;

use config::load_settings;

/// Switches lighting console shows to follow the video mixer's program scene.
#[derive(Parser, Debug)]
struct Args {
    /// Settings file; missing is fine, malformed is fatal.
    #[arg(long, default_value = "bridge.toml")]
    config: PathBuf,
    /// Scene to show mapping file, overrides `mappings_path` from the settings.
    #[arg(long)]
    mappings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;
    if let Some(mappings) = args.mappings {
        settings.mappings_path = mappings;
    }
    settings.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let scenes = SceneMap::load(&settings.mappings_path).with_context(|| {
        format!(
            "cannot start without scene mappings from '{}'",
            settings.mappings_path.display()
        )
    })?;
    info!(
        scenes = scenes.len(),
        path = %settings.mappings_path.display(),
        "loaded scene mappings"
    );

    let bridge = Bridge::new(settings.bridge_config(), scenes).spawn();
    info!(
        mixer = %settings.mixer_url,
        lighting = %settings.lighting_url,
        "ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");
    bridge.shutdown().await;
    Ok(())
}
