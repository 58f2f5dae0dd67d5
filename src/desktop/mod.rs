use crate::config::ApodConfig;
use crate::pipeline::IngestOutcome;
use crate::Result;
use std::path::Path;
use tracing::warn;

pub mod command;
pub mod hyprland;
pub mod macos;
pub mod plasma;

pub trait WallpaperManager {
    fn name(&self) -> &'static str;
    fn set_wallpaper(&self, path: &Path) -> Result<()>;
    fn notify(&self, title: &str, message: &str, image: Option<&Path>) -> Result<()>;
}

pub fn get_wallpaper_manager(config: &ApodConfig) -> Result<Box<dyn WallpaperManager>> {
    if let Some(template) = &config.wallpaper_command {
        return Ok(Box::new(command::CommandManager::new(template)?));
    }

    if cfg!(target_os = "macos") {
        return Ok(Box::new(macos::FinderManager::new()?));
    }

    let desktop = std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();

    match desktop.to_lowercase().as_str() {
        "hyprland" => Ok(Box::new(hyprland::HyprlandManager::new()?)),
        "kde" | "plasma" => Ok(Box::new(plasma::PlasmaManager::new()?)),
        _ => {
            if hyprland::HyprlandManager::is_available() {
                Ok(Box::new(hyprland::HyprlandManager::new()?))
            } else if plasma::PlasmaManager::is_available() {
                Ok(Box::new(plasma::PlasmaManager::new()?))
            } else {
                Err(crate::Error::DesktopEnv(
                    "No supported desktop environment found".to_string(),
                ))
            }
        }
    }
}

/// Applies the cached image of `outcome` as the desktop background.
///
/// Runs after the ingest has committed; an error here leaves the cache as is.
pub fn apply(config: &ApodConfig, outcome: &IngestOutcome) -> Result<()> {
    let image_path = outcome.image_path();
    let manager = get_wallpaper_manager(config)?;

    manager.set_wallpaper(image_path)?;
    println!("Setting the desktop background image ({})", manager.name());

    if config.notify {
        if let Err(e) = manager.notify("APOD Wallpaper", "Desktop background updated", Some(image_path)) {
            warn!(error = %e, "notification failed");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apod::ApodEntry;
    use crate::pipeline::IngestPipeline;
    use crate::Error;
    use anyhow::Result;
    use tempfile::tempdir;

    const MEDIA_URL: &str = "https://apod.nasa.gov/apod/image/2001/galaxy.jpg";

    fn galaxy_view() -> ApodEntry {
        ApodEntry {
            date: "2020-01-01".to_string(),
            title: "Galaxy View".to_string(),
            explanation: "A spiral galaxy.".to_string(),
            media_type: "image".to_string(),
            hd_url: Some(MEDIA_URL.to_string()),
            url: None,
            thumbnail_url: None,
        }
    }

    fn command_config(command: &str) -> ApodConfig {
        ApodConfig {
            wallpaper_command: Some(command.to_string()),
            notify: false,
            ..ApodConfig::default()
        }
    }

    #[test]
    fn failed_wallpaper_keeps_the_committed_entry() -> Result<()> {
        let dir = tempdir()?;
        let pipeline = IngestPipeline::open(dir.path())?;
        let outcome = pipeline.commit(&galaxy_view(), MEDIA_URL, b"galaxy")?;

        let err = apply(&command_config("exit 3 #"), &outcome)
            .err()
            .expect("failing command should be reported");
        assert!(matches!(err, Error::DesktopEnv(_)), "unexpected error {:?}", err);
        assert_eq!(err.stage(), "wallpaper");

        assert_eq!(pipeline.index().count()?, 1);
        assert!(outcome.image_path().is_file());
        assert!(pipeline.orphan_blobs()?.is_empty());
        Ok(())
    }

    #[test]
    fn wallpaper_command_receives_the_cached_path() -> Result<()> {
        let dir = tempdir()?;
        let pipeline = IngestPipeline::open(dir.path())?;
        let outcome = pipeline.commit(&galaxy_view(), MEDIA_URL, b"galaxy")?;
        let marker = dir.path().join("applied.txt");

        let command = format!("printf '%s' {{}} > '{}'", marker.display());
        apply(&command_config(&command), &outcome)?;

        assert_eq!(
            std::fs::read_to_string(&marker)?,
            outcome.image_path().to_string_lossy()
        );
        Ok(())
    }
}
