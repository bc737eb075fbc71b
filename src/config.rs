use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, ensure};
use serde::Deserialize;

/// Top-level YAML configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    /// Backend root; property records live under `info/{id}` below it.
    pub api_base_url: String,
    /// Prefix for relative image paths. Defaults to `api-base-url`.
    #[serde(default)]
    pub image_base_url: Option<String>,
    /// Per-request timeout for record and image fetches.
    #[serde(default = "Configuration::default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Maximum texture loads running at once.
    #[serde(default = "Configuration::default_loader_max_in_flight")]
    pub loader_max_in_flight: usize,
    /// Largest accepted texture edge, in pixels.
    #[serde(default = "Configuration::default_max_texture_dimension")]
    pub max_texture_dimension: u32,
    /// Capacity of the UI -> viewer command channel.
    #[serde(default = "Configuration::default_command_queue")]
    pub command_queue: usize,
}

impl Configuration {
    const fn default_request_timeout() -> Duration {
        Duration::from_secs(15)
    }

    const fn default_loader_max_in_flight() -> usize {
        4
    }

    const fn default_max_texture_dimension() -> u32 {
        16_384
    }

    const fn default_command_queue() -> usize {
        16
    }

    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            image_base_url: None,
            request_timeout: Self::default_request_timeout(),
            loader_max_in_flight: Self::default_loader_max_in_flight(),
            max_texture_dimension: Self::default_max_texture_dimension(),
            command_queue: Self::default_command_queue(),
        }
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    pub fn validated(self) -> Result<Self> {
        ensure!(
            is_http_url(&self.api_base_url),
            "api-base-url must be an http(s) URL"
        );
        if let Some(base) = &self.image_base_url {
            ensure!(is_http_url(base), "image-base-url must be an http(s) URL");
        }
        ensure!(
            self.request_timeout > Duration::from_secs(0),
            "request-timeout must be positive"
        );
        ensure!(
            self.loader_max_in_flight > 0,
            "loader-max-in-flight must be greater than zero"
        );
        ensure!(
            self.max_texture_dimension > 0,
            "max-texture-dimension must be greater than zero"
        );
        ensure!(
            self.command_queue > 0,
            "command-queue must be greater than zero"
        );
        reqwest::Url::parse(&self.api_base_url).context("api-base-url is not a valid URL")?;
        Ok(self)
    }

    pub fn image_base_url(&self) -> &str {
        self.image_base_url.as_deref().unwrap_or(&self.api_base_url)
    }

    /// Endpoint of one property record. `id` is appended as a single,
    /// percent-encoded path segment.
    pub fn property_url(&self, id: &str) -> Result<reqwest::Url> {
        let mut url =
            reqwest::Url::parse(&self.api_base_url).context("api-base-url is not a valid URL")?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("api-base-url cannot carry a path"))?
            .pop_if_empty()
            .push("info")
            .push(id);
        Ok(url)
    }
}

fn is_http_url(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}
