use std::fs;
use std::path::Path;
use std::time::Duration;

use crawlwatch_core::{PollIntervals, RetryPolicy};
use crawlwatch_engine::{ApiSettings, DEFAULT_API_BASE};
use crawlwatch_logging::{watch_info, watch_warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "crawlwatch.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub base_ms: u64,
    pub max_delay_ms: u64,
    pub max_retries: u32,
}

impl Default for RetrySection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            base_ms: millis(policy.base),
            max_delay_ms: millis(policy.max_delay),
            max_retries: policy.max_retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSection {
    pub progress_ms: u64,
    pub stats_ms: u64,
    pub graph_ms: u64,
}

impl Default for PollSection {
    fn default() -> Self {
        let intervals = PollIntervals::default();
        Self {
            progress_ms: millis(intervals.progress),
            stats_ms: millis(intervals.stats),
            graph_ms: millis(intervals.graph),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub retry: RetrySection,
    pub poll: PollSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            connect_timeout_ms: millis(api.connect_timeout),
            request_timeout_ms: millis(api.request_timeout),
            retry: RetrySection::default(),
            poll: PollSection::default(),
        }
    }
}

impl AppConfig {
    /// Reads the config file. A missing file means defaults; a broken one is
    /// reported and also falls back to defaults.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Self::default();
            }
            Err(err) => {
                watch_warn!("Failed to read config from {:?}: {}", path, err);
                return Self::default();
            }
        };

        match ron::from_str(&content) {
            Ok(config) => {
                watch_info!("Loaded config from {:?}", path);
                config
            }
            Err(err) => {
                watch_warn!("Failed to parse config from {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base: Duration::from_millis(self.retry.base_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            max_retries: self.retry.max_retries,
        }
    }

    pub fn poll_intervals(&self) -> PollIntervals {
        PollIntervals {
            progress: Duration::from_millis(self.poll.progress_ms),
            stats: Duration::from_millis(self.poll.stats_ms),
            graph: Duration::from_millis(self.poll.graph_ms),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
