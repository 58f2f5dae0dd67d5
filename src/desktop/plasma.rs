use super::WallpaperManager;
use crate::utils::{check_output, command_exists, run_command};
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;

#[cfg(feature = "cli")]
use crate::utils::send_notification;

pub struct PlasmaManager;

impl PlasmaManager {
    pub fn new() -> Result<Self> {
        if !command_exists("qdbus") {
            return Err(Error::DesktopEnv(
                "QDBus command not found. Please install qdbus.".to_string(),
            ));
        }
        Ok(Self)
    }

    pub fn is_available() -> bool {
        std::env::var("KDE_SESSION_VERSION").is_ok()
    }
}

fn wallpaper_script(path: &Path) -> String {
    format!(
        r#"
        var allDesktops = desktops();
        for (i=0;i<allDesktops.length;i++) {{
            d = allDesktops[i];
            d.wallpaperPlugin = "org.kde.image";
            d.currentConfigGroup = Array("Wallpaper", "org.kde.image", "General");
            d.writeConfig("Image", "file://{}");
        }}
        "#,
        path.to_string_lossy().replace('"', "\\\"")
    )
}

impl WallpaperManager for PlasmaManager {
    fn name(&self) -> &'static str {
        "KDE Plasma"
    }

    fn set_wallpaper(&self, path: &Path) -> Result<()> {
        let output = run_command(Command::new("qdbus").args([
            "org.kde.plasmashell",
            "/PlasmaShell",
            "org.kde.PlasmaShell.evaluateScript",
            wallpaper_script(path).as_str(),
        ]))?;

        check_output("Setting the Plasma wallpaper", output)
    }

    fn notify(&self, title: &str, message: &str, image: Option<&Path>) -> Result<()> {
        #[cfg(feature = "cli")]
        {
            if !command_exists("kdialog") {
                return send_notification(title, message, image);
            }

            let mut cmd = Command::new("kdialog");
            cmd.args(["--title", title, "--passivepopup", message, "5"]);

            if let Some(image_path) = image {
                cmd.args(["--icon", &*image_path.to_string_lossy()]);
            }

            let output = run_command(&mut cmd)?;

            if !output.status.success() {
                return send_notification(title, message, image);
            }

            Ok(())
        }
        #[cfg(not(feature = "cli"))]
        {
            let _ = (title, message, image);
            Ok(())
        }
    }
}
