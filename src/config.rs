//! Dashboard configuration
//!
//! One struct holding every externally-configurable knob, loaded from the
//! environment with sensible defaults. Both the REST client and the push
//! channel derive their endpoints from `base_url`.

use std::time::Duration;

/// Dashboard configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Backend root for REST and push-channel traffic
    pub base_url: String,
    /// Push-channel mount point (Socket.IO)
    pub channel_path: String,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// HTTP connect timeout
    pub connect_timeout: Duration,
    /// Minimum gap between live-signal-triggered history refreshes
    pub refresh_min_interval: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            channel_path: "/socket.io/".to_string(),
            http_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            refresh_min_interval: Duration::from_millis(2000),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("CAMDECK_BASE_URL").unwrap_or(defaults.base_url),
            channel_path: std::env::var("CAMDECK_CHANNEL_PATH").unwrap_or(defaults.channel_path),
            http_timeout: env_millis("CAMDECK_HTTP_TIMEOUT_MS").unwrap_or(defaults.http_timeout),
            connect_timeout: env_millis("CAMDECK_CONNECT_TIMEOUT_MS")
                .unwrap_or(defaults.connect_timeout),
            refresh_min_interval: env_millis("CAMDECK_REFRESH_MIN_INTERVAL_MS")
                .unwrap_or(defaults.refresh_min_interval),
        }
    }

    /// Backend root without a trailing slash
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}
