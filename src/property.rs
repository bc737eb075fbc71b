//! Property records from the booking backend.
//!
//! Only the `panoramic` field matters here. A missing, `null`, or empty list
//! is reported as `NoData`, which the UI shows differently from a failed
//! fetch and from a fetch still in progress.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::Configuration;
use crate::error::PanoramaError;
use crate::rooms::{ImageRef, RoomMap, group_by_room};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyRecord {
    #[serde(default)]
    pub panoramic: Option<Vec<ImageRef>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanoramaStatus {
    Loading,
    NoData,
    FetchFailed(String),
    Ready(RoomMap),
}

impl Default for PanoramaStatus {
    /// A viewer that has not received its record yet.
    fn default() -> Self {
        Self::Loading
    }
}

impl PanoramaStatus {
    pub fn from_record(record: PropertyRecord) -> Self {
        match record.panoramic {
            Some(images) if !images.is_empty() => {
                let rooms = group_by_room(images);
                if rooms.is_empty() {
                    Self::NoData
                } else {
                    Self::Ready(rooms)
                }
            }
            _ => Self::NoData,
        }
    }

    /// The error to surface, if this status is one.
    pub fn error(&self) -> Option<PanoramaError> {
        match self {
            Self::NoData => Some(PanoramaError::NoData),
            Self::FetchFailed(reason) => Some(PanoramaError::FetchFailed(reason.clone())),
            Self::Loading | Self::Ready(_) => None,
        }
    }

    pub fn into_result(self) -> Result<RoomMap, PanoramaError> {
        match self {
            Self::Ready(rooms) => Ok(rooms),
            Self::NoData => Err(PanoramaError::NoData),
            Self::FetchFailed(reason) => Err(PanoramaError::FetchFailed(reason)),
            Self::Loading => Err(PanoramaError::NotLoaded),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PropertyClient {
    client: reqwest::Client,
    cfg: Configuration,
}

impl PropertyClient {
    pub fn new(cfg: &Configuration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .context("failed to build property http client")?;
        Ok(Self {
            client,
            cfg: cfg.clone(),
        })
    }

    pub async fn fetch_record(&self, id: &str) -> Result<PropertyRecord> {
        let url = self.cfg.property_url(id)?;
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            bail!("property request failed status={status} url={url}");
        }
        resp.json::<PropertyRecord>()
            .await
            .with_context(|| format!("invalid property record at {url}"))
    }

    /// Fetches and groups the panoramic images of one property. Never errors;
    /// failures come back as `FetchFailed`.
    #[instrument(skip(self))]
    pub async fn load_panorama(&self, id: &str) -> PanoramaStatus {
        match self.fetch_record(id).await {
            Ok(record) => {
                let status = PanoramaStatus::from_record(record);
                match &status {
                    PanoramaStatus::Ready(rooms) => {
                        info!(rooms = rooms.len(), images = rooms.image_count(), "panorama ready")
                    }
                    _ => info!("no panoramic images for property"),
                }
                status
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to fetch panoramic images");
                PanoramaStatus::FetchFailed(format!("{err:#}"))
            }
        }
    }
}
