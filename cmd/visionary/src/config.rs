//! Server configuration: YAML file, environment and flags.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use visionary_studio::{RetryPolicy, DEFAULT_PROBE_TIMEOUT};

/// Environment variable holding the default provider key.
pub const API_KEY_ENV: &str = "BRIA_API_KEY";

/// Default listen address.
pub const DEFAULT_LISTEN: &str = ":8000";

/// Default idle time after which a pending batch is dropped.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(3600);

/// Configuration file format.
///
/// ```yaml
/// listen: ":8000"
/// base_url: https://engine.prod.bria-api.com
/// api_key: $BRIA_API_KEY
/// timeout_secs: 120
/// probe_timeout_secs: 10
/// pending_ttl_secs: 3600   # 0 keeps batches forever
/// poll:
///   max_attempts: 3
///   interval_ms: 2000
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub listen: Option<String>,
    pub base_url: Option<String>,
    /// Supports `$VAR` / `${VAR}`.
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
    pub pending_ttl_secs: Option<u64>,
    pub poll: PollFileConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PollFileConfig {
    pub max_attempts: Option<u32>,
    pub interval_ms: Option<u64>,
}

impl FileConfig {
    /// Loads a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Resolved server configuration.
#[derive(Clone)]
pub struct Config {
    pub listen: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub probe_timeout: Duration,
    pub retry: RetryPolicy,
    /// `None` disables eviction.
    pub pending_ttl: Option<Duration>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen", &self.listen)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("probe_timeout", &self.probe_timeout)
            .field("retry", &self.retry)
            .field("pending_ttl", &self.pending_ttl)
            .finish()
    }
}

impl Config {
    /// Merges sources: flag, then file, then environment, then defaults.
    pub fn resolve(
        listen: Option<String>,
        base_url: Option<String>,
        file: FileConfig,
        env_api_key: Option<String>,
    ) -> Self {
        let defaults = RetryPolicy::default();
        Self {
            listen: listen
                .or(file.listen)
                .unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            base_url: base_url
                .or(file.base_url)
                .unwrap_or_else(|| visionary_bria::DEFAULT_BASE_URL.to_string()),
            api_key: file
                .api_key
                .map(|k| expand_env(&k))
                .filter(|k| !k.trim().is_empty())
                .or(env_api_key.filter(|k| !k.trim().is_empty())),
            timeout: file
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(visionary_bria::DEFAULT_TIMEOUT),
            probe_timeout: file
                .probe_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_PROBE_TIMEOUT),
            retry: RetryPolicy {
                max_attempts: file.poll.max_attempts.unwrap_or(defaults.max_attempts),
                interval: file
                    .poll
                    .interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.interval),
            },
            pending_ttl: match file.pending_ttl_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => Some(DEFAULT_PENDING_TTL),
            },
        }
    }
}

/// Expand environment variables in a string ($VAR or ${VAR}).
fn expand_env(s: &str) -> String {
    if let Some(rest) = s.strip_prefix('$') {
        let var_name = rest
            .strip_prefix('{')
            .and_then(|r| r.strip_suffix('}'))
            .unwrap_or(rest);
        std::env::var(var_name).unwrap_or_default()
    } else {
        s.to_string()
    }
}

/// Parse address string to SocketAddr. `:8000` binds all interfaces.
pub fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    addr.parse()
        .with_context(|| format!("invalid listen address {addr:?}"))
}
