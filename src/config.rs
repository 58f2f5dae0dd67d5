use crate::utils::get_config_dir;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, read_to_string, write};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://api.nasa.gov/planetary/apod";
const DEMO_API_KEY: &str = "DEMO_KEY";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ApodConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_true")]
    pub set_wallpaper: bool,
    #[serde(default = "default_true")]
    pub notify: bool,
    /// Shell command used instead of desktop detection, `{}` is the image path.
    #[serde(default)]
    pub wallpaper_command: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ApodConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            set_wallpaper: true,
            notify: true,
            wallpaper_command: None,
        }
    }
}

impl ApodConfig {
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = read_to_string(&config_path)?;
            let config = Self::from_json(&content)?;
            config.save()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        write(&config_path, content)?;
        Ok(())
    }

    /// Key from `NASA_API_KEY`, then the config file, then the public demo key.
    pub fn resolve_api_key(&self) -> String {
        std::env::var("NASA_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.api_key.clone())
            .unwrap_or_else(|| DEMO_API_KEY.to_string())
    }

    fn config_path() -> Result<PathBuf> {
        Ok(get_config_dir()?.join(PathBuf::from("config.json")))
    }
}
