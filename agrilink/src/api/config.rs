//! Scan and client configuration.
//!
//! Both [`ScanConfig`] and [`AgriConfig`] follow a builder style and can be
//! loaded from a TOML file where every duration is given in milliseconds:
//!
//! ```toml
//! analysis_base_url = "http://10.0.0.5:8080"
//!
//! [scan]
//! probe_timeout_ms = 1000
//! scan_deadline_ms = 8000
//! host_range_start = 1
//! host_range_end = 60
//! ```
//!
//! The default weather endpoint is weatherapi.com, which rejects requests
//! without an API key. Set the full URL including your key:
//!
//! ```toml
//! weather_url = "http://api.weatherapi.com/v1/forecast.json?key=YOUR_KEY&q=Colombo&days=1"
//! weather_timeout_ms = 10000
//! ```

use log::{info, warn};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Result;
use crate::api::models::AgriError;
use crate::types::constants::{DEFAULT_ANALYSIS_BASE_URL, DEFAULT_WEATHER_URL, discovery, timeouts};

/// Parameters of one discovery scan.
///
/// # Example
///
/// ```
/// use agrilink::ScanConfig;
/// use std::time::Duration;
///
/// let config = ScanConfig::new()
///     .with_host_range(1..=80)
///     .with_scan_deadline(Duration::from_secs(12));
/// assert_eq!(config.host_range, 1..=80);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Timeout for each literal subnet address.
    pub probe_timeout: Duration,
    /// Timeout for hostnames and the fast-path address.
    pub hostname_probe_timeout: Duration,
    /// Overall deadline after which pending probes are cancelled.
    pub scan_deadline: Duration,
    /// Host octets of the local /24 to probe.
    pub host_range: RangeInclusive<u8>,
    /// mDNS hostnames probed on every scan.
    pub hostnames: Vec<String>,
    /// Address tried first, where the sensor node usually lives.
    pub fast_path_address: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe_timeout: timeouts::probe_timeout(),
            hostname_probe_timeout: timeouts::hostname_probe_timeout(),
            scan_deadline: timeouts::scan_deadline(),
            host_range: discovery::HOST_RANGE_START..=discovery::HOST_RANGE_END,
            hostnames: discovery::KNOWN_HOSTNAMES
                .iter()
                .map(|h| h.to_string())
                .collect(),
            fast_path_address: Some(discovery::FAST_PATH_ADDRESS.to_string()),
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_hostname_probe_timeout(mut self, timeout: Duration) -> Self {
        self.hostname_probe_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_scan_deadline(mut self, deadline: Duration) -> Self {
        self.scan_deadline = deadline;
        self
    }

    /// Sets the probed host octets. `0` and `255` are never probed.
    #[must_use]
    pub fn with_host_range(mut self, range: RangeInclusive<u8>) -> Self {
        self.host_range = range;
        self
    }

    #[must_use]
    pub fn with_hostnames<I, S>(mut self, hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hostnames = hostnames.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_fast_path_address(mut self, address: Option<String>) -> Self {
        self.fast_path_address = address;
        self
    }
}

/// Configuration for the whole client.
#[derive(Debug, Clone, PartialEq)]
pub struct AgriConfig {
    pub scan: ScanConfig,
    /// Timeout for the sensor read on connect.
    pub sensor_timeout: Duration,
    /// Base URL of the analysis service, without a trailing slash.
    pub analysis_base_url: String,
    pub submission_timeout: Duration,
    /// Weather endpoint, including the provider's `key` parameter.
    pub weather_url: String,
    pub weather_timeout: Duration,
    pub weather_interval: Duration,
}

impl Default for AgriConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            sensor_timeout: timeouts::sensor_timeout(),
            analysis_base_url: DEFAULT_ANALYSIS_BASE_URL.to_string(),
            submission_timeout: timeouts::submission_timeout(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            weather_timeout: timeouts::weather_timeout(),
            weather_interval: timeouts::weather_interval(),
        }
    }
}

impl AgriConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_scan(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    #[must_use]
    pub fn with_sensor_timeout(mut self, timeout: Duration) -> Self {
        self.sensor_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_analysis_base_url(mut self, url: impl Into<String>) -> Self {
        self.analysis_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_submission_timeout(mut self, timeout: Duration) -> Self {
        self.submission_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_weather_url(mut self, url: impl Into<String>) -> Self {
        self.weather_url = url.into();
        self
    }

    #[must_use]
    pub fn with_weather_timeout(mut self, timeout: Duration) -> Self {
        self.weather_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_weather_interval(mut self, interval: Duration) -> Self {
        self.weather_interval = interval;
        self
    }

    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| AgriError::Config(e.to_string()))?;
        raw.into_config()
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Per-user configuration file, e.g. `~/.config/agrilink/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("agrilink").join("config.toml"))
    }

    /// Loads the first configuration file found, falling back to defaults.
    ///
    /// Looks at [`AgriConfig::default_path`] and then `./agrilink.toml`.
    pub fn load_or_default() -> Self {
        let candidates = Self::default_path()
            .into_iter()
            .chain(std::iter::once(PathBuf::from("agrilink.toml")));

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    return config;
                }
                Err(e) => warn!("Ignoring configuration at {}: {e}", path.display()),
            }
        }

        info!("No configuration file found, using defaults");
        Self::default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    scan: RawScanConfig,
    sensor_timeout_ms: Option<u64>,
    analysis_base_url: Option<String>,
    submission_timeout_ms: Option<u64>,
    weather_url: Option<String>,
    weather_timeout_ms: Option<u64>,
    weather_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawScanConfig {
    probe_timeout_ms: Option<u64>,
    hostname_probe_timeout_ms: Option<u64>,
    scan_deadline_ms: Option<u64>,
    host_range_start: Option<u8>,
    host_range_end: Option<u8>,
    hostnames: Option<Vec<String>>,
    fast_path_address: Option<String>,
}

impl RawConfig {
    fn into_config(self) -> Result<AgriConfig> {
        let defaults = AgriConfig::default();
        let scan = self.scan.into_config(defaults.scan)?;

        let analysis_base_url = self
            .analysis_base_url
            .unwrap_or(defaults.analysis_base_url);
        if analysis_base_url.trim().is_empty() {
            return Err(AgriError::Config("analysis_base_url is empty".into()));
        }

        Ok(AgriConfig {
            scan,
            sensor_timeout: self
                .sensor_timeout_ms
                .map_or(defaults.sensor_timeout, Duration::from_millis),
            analysis_base_url: analysis_base_url.trim_end_matches('/').to_string(),
            submission_timeout: self
                .submission_timeout_ms
                .map_or(defaults.submission_timeout, Duration::from_millis),
            weather_url: self.weather_url.unwrap_or(defaults.weather_url),
            weather_timeout: self
                .weather_timeout_ms
                .map_or(defaults.weather_timeout, Duration::from_millis),
            weather_interval: self
                .weather_interval_ms
                .map_or(defaults.weather_interval, Duration::from_millis),
        })
    }
}

impl RawScanConfig {
    fn into_config(self, defaults: ScanConfig) -> Result<ScanConfig> {
        let start = self.host_range_start.unwrap_or(*defaults.host_range.start());
        let end = self.host_range_end.unwrap_or(*defaults.host_range.end());
        if start == 0 || end == 255 || start > end {
            return Err(AgriError::Config(format!(
                "invalid host range {start}..={end}, expected 1..=254 with start <= end"
            )));
        }

        // An empty string in the file disables the fast path.
        let fast_path_address = match self.fast_path_address {
            Some(addr) if addr.is_empty() => None,
            Some(addr) => Some(addr),
            None => defaults.fast_path_address,
        };

        Ok(ScanConfig {
            probe_timeout: self
                .probe_timeout_ms
                .map_or(defaults.probe_timeout, Duration::from_millis),
            hostname_probe_timeout: self
                .hostname_probe_timeout_ms
                .map_or(defaults.hostname_probe_timeout, Duration::from_millis),
            scan_deadline: self
                .scan_deadline_ms
                .map_or(defaults.scan_deadline, Duration::from_millis),
            host_range: start..=end,
            hostnames: self.hostnames.unwrap_or(defaults.hostnames),
            fast_path_address,
        })
    }
}
