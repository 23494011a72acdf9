//! Retry configuration for network operations.
//!
//! Provides configurable retry limits for different operation types,
//! allowing users to tune retry behavior based on network conditions.

use std::time::Duration;

/// Configuration for retry and polling behavior across operation types
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Max attempts for artifact downloads
    pub downloads: u32,

    /// Max attempts for staging uploads
    pub uploads: u32,

    /// Seconds between publish-operation polls
    pub poll_interval_secs: u64,

    /// Wall-clock bound in seconds on waiting for a publish operation
    pub publish_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            downloads: 3,
            uploads: 3,
            poll_interval_secs: 10,
            publish_timeout_secs: 300,
        }
    }
}

impl RetryConfig {
    /// Parse a numeric knob from an environment variable with clamping
    ///
    /// # Arguments
    /// * `var_name` - Environment variable name (e.g., "PKGMIRROR_RETRY_DOWNLOADS")
    /// * `default` - Default value if variable is not set or invalid
    /// * `max` - Maximum allowed value (values above this are clamped)
    fn parse_env(var_name: &str, default: u64, max: u64) -> u64 {
        std::env::var(var_name)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|v| v.min(max))
            .unwrap_or(default)
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        Self {
            downloads: Self::parse_env("PKGMIRROR_RETRY_DOWNLOADS", 3, 10) as u32,
            uploads: Self::parse_env("PKGMIRROR_RETRY_UPLOADS", 3, 10) as u32,
            poll_interval_secs: Self::parse_env("PKGMIRROR_POLL_INTERVAL", 10, 120),
            publish_timeout_secs: Self::parse_env("PKGMIRROR_PUBLISH_TIMEOUT", 300, 3600),
        }
    }

    /// Override both retry bounds from a single CLI flag
    pub fn with_retries(mut self, retries: Option<u32>) -> Self {
        if let Some(bound) = retries {
            self.downloads = bound;
            self.uploads = bound;
        }
        self
    }

    /// Polling interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Publish timeout as a `Duration`
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }

    /// Validate retry counts are reasonable
    pub fn validate(&self) -> Result<(), String> {
        if self.downloads == 0 || self.downloads > 10 {
            return Err(format!(
                "downloads retry count out of range: {} (1..=10)",
                self.downloads
            ));
        }
        if self.uploads == 0 || self.uploads > 10 {
            return Err(format!(
                "uploads retry count out of range: {} (1..=10)",
                self.uploads
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err("poll interval must be at least 1 second".to_string());
        }
        if self.publish_timeout_secs < self.poll_interval_secs {
            return Err(format!(
                "publish timeout ({}s) shorter than poll interval ({}s)",
                self.publish_timeout_secs, self.poll_interval_secs
            ));
        }
        Ok(())
    }
}
