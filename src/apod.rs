use crate::config::ApodConfig;
use crate::date::DATE_FORMAT;
use crate::{Error, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// One APOD entry as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApodEntry {
    #[serde(default)]
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    pub media_type: String,
    #[serde(rename = "hdurl")]
    pub hd_url: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl ApodEntry {
    /// URL of the file to cache: the HD image for images, the thumbnail for videos.
    pub fn media_url(&self) -> Result<&str> {
        match self.media_type.as_str() {
            "image" => self
                .hd_url
                .as_deref()
                .or(self.url.as_deref())
                .ok_or_else(|| Error::Source(format!("APOD '{}' has no image URL", self.title))),
            "video" => self.thumbnail_url.as_deref().ok_or_else(|| {
                Error::Source(format!("APOD video '{}' has no thumbnail", self.title))
            }),
            other => Err(Error::UnsupportedMediaType(other.to_string())),
        }
    }
}

pub struct ApodClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ApodClient {
    pub fn new(config: &ApodConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.resolve_api_key(),
        }
    }

    pub async fn fetch_entry(&self, date: NaiveDate) -> Result<ApodEntry> {
        let url = format!(
            "{}?api_key={}&date={}&thumbs=true",
            self.api_url,
            self.api_key,
            date.format(DATE_FORMAT)
        );
        debug!(date = %date, "requesting APOD metadata");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(if status.as_u16() == 403 {
                Error::Source("API rate limit exceeded or invalid API key".to_string())
            } else {
                Error::Source(format!("Failed to fetch APOD data: HTTP {}", status))
            });
        }

        let entry: ApodEntry = response.json().await?;
        Ok(entry)
    }

    pub async fn download(&self, media_url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(media_url).send().await?;

        if !response.status().is_success() {
            return Err(Error::Source(format!(
                "Failed to download {}: HTTP {}",
                media_url,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        debug!(url = media_url, size = bytes.len(), "media downloaded");
        Ok(bytes.to_vec())
    }
}
