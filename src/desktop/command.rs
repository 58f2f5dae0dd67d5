use super::WallpaperManager;
use crate::utils::{check_output, run_command};
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;

#[cfg(feature = "cli")]
use crate::utils::send_notification;

/// Runs a user-supplied shell command, replacing `{}` with the image path.
pub struct CommandManager {
    template: String,
}

impl CommandManager {
    pub fn new(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(Error::Config("wallpaper_command is empty".to_string()));
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    fn render(&self, path: &Path) -> String {
        let quoted = format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"));
        if self.template.contains("{}") {
            self.template.replace("{}", &quoted)
        } else {
            format!("{} {}", self.template, quoted)
        }
    }
}

impl WallpaperManager for CommandManager {
    fn name(&self) -> &'static str {
        "custom command"
    }

    fn set_wallpaper(&self, path: &Path) -> Result<()> {
        let output = run_command(Command::new("sh").arg("-c").arg(self.render(path)))?;
        check_output("Wallpaper command", output)
    }

    fn notify(&self, title: &str, message: &str, image: Option<&Path>) -> Result<()> {
        #[cfg(feature = "cli")]
        send_notification(title, message, image)?;
        #[cfg(not(feature = "cli"))]
        let _ = (title, message, image);
        Ok(())
    }
}
