//! DetectionClient - Backend REST Access
//!
//! ## Responsibilities
//!
//! - Fetch the detection history list
//! - Fetch raw detection images
//! - Delete single records
//! - Fetch the aggregate stats snapshot
//!
//! One attempt per call, no retries, no backoff. Any transport failure or
//! non-success status surfaces as `Error::Network` and propagates to the
//! caller unchanged.

use std::time::Duration;

use crate::config::DashboardConfig;
use crate::error::{Error, Result};
use crate::models::{DetectionRecord, StatsSnapshot};

/// Backend REST client
#[derive(Debug, Clone)]
pub struct DetectionClient {
    http: reqwest::Client,
    base_url: String,
}

impl DetectionClient {
    /// Build a client from the dashboard configuration
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        Self::with_timeouts(
            config.trimmed_base_url(),
            config.http_timeout,
            config.connect_timeout,
        )
    }

    /// Build a client against an explicit base URL
    pub fn with_timeouts(
        base_url: &str,
        http_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(http_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full detection history, in server order
    pub async fn list_detections(&self) -> Result<Vec<DetectionRecord>> {
        let url = format!("{}/api/detections", self.base_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "GET /api/detections returned {}",
                status
            )));
        }
        let records = response.json::<Vec<DetectionRecord>>().await?;
        tracing::debug!(count = records.len(), "Fetched detection history");
        Ok(records)
    }

    /// Fetch raw image bytes for a server-relative path
    pub async fn fetch_image(&self, image_path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/images/{}", self.base_url, image_path);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "GET /api/images/{} returned {}",
                image_path, status
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Delete one detection record.
    ///
    /// No batching: bulk deletion is one call per id at the caller.
    pub async fn delete_detection(&self, id: i64) -> Result<()> {
        let url = format!("{}/api/detections/{}", self.base_url, id);
        let response = self.http.delete(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "DELETE /api/detections/{} returned {}",
                id, status
            )));
        }
        tracing::debug!(id, "Detection deleted");
        Ok(())
    }

    /// Fetch the aggregate stats snapshot
    pub async fn fetch_stats(&self) -> Result<StatsSnapshot> {
        let url = format!("{}/api/stats", self.base_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("GET /api/stats returned {}", status)));
        }
        Ok(response.json::<StatsSnapshot>().await?)
    }
}
