use super::WallpaperManager;
use crate::utils::{command_exists, run_command};
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;
use tracing::warn;

#[cfg(feature = "cli")]
use crate::utils::send_notification;

struct WallpaperTools {
    has_hyprpaper: bool,
    has_swww: bool,
    has_swaybg: bool,
}

impl WallpaperTools {
    fn detect() -> Self {
        Self {
            has_hyprpaper: command_exists("hyprpaper"),
            has_swww: command_exists("swww"),
            has_swaybg: command_exists("swaybg"),
        }
    }

    fn has_any(&self) -> bool {
        self.has_hyprpaper || self.has_swww || self.has_swaybg
    }
}

pub struct HyprlandManager {
    tools: WallpaperTools,
}

impl HyprlandManager {
    pub fn new() -> Result<Self> {
        let tools = WallpaperTools::detect();
        if !tools.has_any() {
            return Err(Error::DesktopEnv(
                "No supported wallpaper tool found. Please install one of hyprpaper, swww, or swaybg."
                    .to_string(),
            ));
        }
        Ok(Self { tools })
    }

    pub fn is_available() -> bool {
        std::env::var("HYPRLAND_INSTANCE_SIGNATURE").is_ok()
            || Command::new("hyprctl").arg("version").output().is_ok()
    }
}

impl WallpaperManager for HyprlandManager {
    fn name(&self) -> &'static str {
        "Hyprland"
    }

    fn set_wallpaper(&self, path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();

        if self.tools.has_hyprpaper {
            let preload =
                run_command(Command::new("hyprctl").args(["hyprpaper", "preload", &*path_str]))?;
            let output = run_command(Command::new("hyprctl").args([
                "hyprpaper",
                "wallpaper",
                format!(",{}", path_str).as_str(),
            ]))?;

            if preload.status.success() && output.status.success() {
                return Ok(());
            }
            warn!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "hyprpaper command failed"
            );
        }

        if self.tools.has_swww {
            let output =
                run_command(Command::new("swww").args(["img", &*path_str, "-t", "grow"]))?;

            if output.status.success() {
                return Ok(());
            }
            warn!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "swww command failed"
            );
        }

        if self.tools.has_swaybg {
            if Command::new("swaybg")
                .args(["-i", &*path_str])
                .spawn()
                .is_ok()
            {
                return Ok(());
            }
            warn!("swaybg command failed to start");
        }

        Err(Error::DesktopEnv(
            "Failed to set wallpaper with hyprpaper, swww, or swaybg".to_string(),
        ))
    }

    fn notify(&self, title: &str, message: &str, image: Option<&Path>) -> Result<()> {
        #[cfg(feature = "cli")]
        send_notification(title, message, image)?;
        #[cfg(not(feature = "cli"))]
        let _ = (title, message, image);
        Ok(())
    }
}
