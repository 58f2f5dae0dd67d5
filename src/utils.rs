use crate::{Error, Result};
use std::fs::create_dir_all;
use std::path::PathBuf;
use std::process::{Command, Output};

#[cfg(feature = "cli")]
use std::path::Path;

pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Runs `cmd` to completion, reporting a missing or unstartable program as a
/// desktop error.
pub fn run_command(cmd: &mut Command) -> Result<Output> {
    cmd.output().map_err(|e| {
        Error::DesktopEnv(format!(
            "Could not run {}: {}",
            cmd.get_program().to_string_lossy(),
            e
        ))
    })
}

/// Turns a failed command output into a desktop error naming `what`.
pub fn check_output(what: &str, output: Output) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::DesktopEnv(format!(
            "{} failed: {}",
            what,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".config"))
        })
        .map(|dir| dir.join(PathBuf::from("apodcache")))
        .ok_or_else(|| Error::Config(
            "Could not find config directory. Please set HOME or XDG_CONFIG_HOME environment variable.".to_string()
        ))?;

    if !config_dir.exists() {
        create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

#[cfg(feature = "cli")]
pub fn send_notification(title: &str, message: &str, image: Option<&Path>) -> Result<()> {
    let mut notification = notify_rust::Notification::new();
    notification.summary(title).body(message);

    if let Some(image_path) = image {
        notification.image_path(image_path.to_string_lossy().as_ref());
    }

    notification
        .show()
        .map_err(|e| Error::DesktopEnv(e.to_string()))?;
    Ok(())
}
