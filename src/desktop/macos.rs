use super::WallpaperManager;
use crate::utils::{check_output, command_exists, run_command};
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;

/// Sets the desktop picture through Finder with `osascript`.
pub struct FinderManager;

impl FinderManager {
    pub fn new() -> Result<Self> {
        if !command_exists("osascript") {
            return Err(Error::DesktopEnv("osascript not found in PATH".to_string()));
        }
        Ok(Self)
    }
}

fn applescript_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn set_picture_script(path: &Path) -> String {
    format!(
        r#"tell application "Finder" to set desktop picture to POSIX file "{}""#,
        applescript_string(&path.to_string_lossy())
    )
}

fn notification_script(title: &str, message: &str) -> String {
    format!(
        r#"display notification "{}" with title "{}""#,
        applescript_string(message),
        applescript_string(title)
    )
}

impl WallpaperManager for FinderManager {
    fn name(&self) -> &'static str {
        "macOS Finder"
    }

    fn set_wallpaper(&self, path: &Path) -> Result<()> {
        let output =
            run_command(Command::new("osascript").args(["-e", set_picture_script(path).as_str()]))?;
        check_output("Setting the desktop picture", output)
    }

    fn notify(&self, title: &str, message: &str, _image: Option<&Path>) -> Result<()> {
        let output = run_command(
            Command::new("osascript").args(["-e", notification_script(title, message).as_str()]),
        )?;
        check_output("Showing the notification", output)
    }
}
