//! `lux [settings.json]`: render a scene described by a settings file.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use lux_core::{load_obj, Settings};
use lux_renderer::{render, Camera, RenderConfig, World};

const DEFAULT_SETTINGS: &str = "lux.json";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS));

    let settings = Settings::load(&settings_path)
        .with_context(|| format!("Failed to read settings from {}", settings_path.display()))?;

    // Bad estimator names fail here, before any geometry is loaded
    let config = RenderConfig::from_settings(&settings).context("Invalid direct lighting settings")?;
    if settings.raytracing.indirect.enable {
        log::warn!("Indirect lighting is not supported, ignoring it");
    }

    let start = Instant::now();
    let scene = load_obj(&settings.scene.obj)
        .with_context(|| format!("Failed to load scene {}", settings.scene.obj.display()))?;
    let world = World::from_scene(scene, settings.scene.cache_dir.as_deref());
    log::info!("Scene ready in {:.2?}", start.elapsed());

    let camera = Camera::from_settings(&settings);
    let image = render(&camera, &world, &config);

    let output = settings.output_name();
    image
        .save_png(&output)
        .with_context(|| format!("Failed to write {}", output))?;

    Ok(())
}
