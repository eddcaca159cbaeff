// Runtime configuration, read from environment variables with defaults:
//
//   GSCLI_BASE_URL             platform root (https://www.gradescope.com)
//   GSCLI_CONFIG_DIR           where the session cache lives
//   GSCLI_POLL_INTERVAL_SECS   seconds between status requests (1)
//   GSCLI_SUBMIT_TIMEOUT_SECS  how long `submit` waits for results (100)
//   GSCLI_STATUS_TIMEOUT_SECS  how long `status` waits for results (60)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::submit::PollConfig;

pub const DEFAULT_BASE_URL: &str = "https://www.gradescope.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub config_dir: PathBuf,
    pub poll_interval: Duration,
    pub submit_timeout: Duration,
    pub status_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("GSCLI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();

        let config_dir = match lookup("GSCLI_CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| anyhow!("no config directory for this user; set GSCLI_CONFIG_DIR"))?
                .join("gscli"),
        };

        Ok(Config {
            base_url,
            config_dir,
            poll_interval: seconds(&lookup, "GSCLI_POLL_INTERVAL_SECS", 1)?,
            submit_timeout: seconds(&lookup, "GSCLI_SUBMIT_TIMEOUT_SECS", 100)?,
            status_timeout: seconds(&lookup, "GSCLI_STATUS_TIMEOUT_SECS", 60)?,
        })
    }

    pub fn submit_poll(&self) -> PollConfig {
        PollConfig {
            interval: self.poll_interval,
            timeout: self.submit_timeout,
        }
    }

    pub fn status_poll(&self) -> PollConfig {
        PollConfig {
            interval: self.poll_interval,
            timeout: self.status_timeout,
        }
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    match lookup(key) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => {
            let secs: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a number of seconds, got {raw:?}"))?;
            Duration::try_from_secs_f64(secs)
                .map_err(|_| anyhow!("{key} must be a non-negative number of seconds, got {raw:?}"))
        }
    }
}
