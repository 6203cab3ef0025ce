//! Constants for the sensor device HTTP interface and scan defaults.
//!
//! These values correspond to the firmware running on the ESP32 sensor
//! nodes and to the remote analysis service this crate talks to.

/// Well-known paths served by a sensor node.
pub mod endpoints {
    /// Device descriptor endpoint, answered by every sensor node.
    pub const DEVICE_INFO: &str = "/api/info";
    /// Live temperature/humidity endpoint.
    pub const DEVICE_SENSOR: &str = "/api/sensor";
    /// Multipart upload endpoint on the analysis service.
    pub const HERBICIDE_ANALYSIS: &str = "/herbicide-analysis";
}

/// Candidate addresses tried on every scan besides the local subnet.
pub mod discovery {
    /// Address the sensor node is usually found at on the field router.
    pub const FAST_PATH_ADDRESS: &str = "192.168.8.2";

    /// mDNS hostnames the sensor firmware advertises.
    pub const KNOWN_HOSTNAMES: &[&str] = &[
        "esp32-dht11.local",
        "esp32-sensor.local",
        "esp-dht11.local",
    ];

    /// First host octet probed in the local /24.
    pub const HOST_RANGE_START: u8 = 1;

    /// Last host octet probed in the local /24.
    ///
    /// Kept well below 254 so a scan stays short on slow phones.
    pub const HOST_RANGE_END: u8 = 40;
}

/// Timeout constants for probing and connecting.
pub mod timeouts {
    use std::time::Duration;

    /// Per-probe timeout for literal subnet addresses (1 second).
    const PROBE_TIMEOUT_MS: u64 = 1_000;

    /// Per-probe timeout for hostnames and the fast path (2 seconds).
    ///
    /// mDNS resolution eats into this budget, so it is longer.
    const HOSTNAME_PROBE_TIMEOUT_MS: u64 = 2_000;

    /// Overall scan deadline (8 seconds).
    const SCAN_DEADLINE_SECS: u64 = 8;

    /// Timeout for the sensor read on connect (5 seconds).
    const SENSOR_TIMEOUT_SECS: u64 = 5;

    /// Timeout for the analysis upload (60 seconds).
    const SUBMISSION_TIMEOUT_SECS: u64 = 60;

    /// Timeout for one weather request (10 seconds).
    const WEATHER_TIMEOUT_SECS: u64 = 10;

    /// Interval between weather refreshes (10 minutes).
    const WEATHER_INTERVAL_SECS: u64 = 600;

    pub fn probe_timeout() -> Duration {
        Duration::from_millis(PROBE_TIMEOUT_MS)
    }

    pub fn hostname_probe_timeout() -> Duration {
        Duration::from_millis(HOSTNAME_PROBE_TIMEOUT_MS)
    }

    pub fn scan_deadline() -> Duration {
        Duration::from_secs(SCAN_DEADLINE_SECS)
    }

    pub fn sensor_timeout() -> Duration {
        Duration::from_secs(SENSOR_TIMEOUT_SECS)
    }

    pub fn submission_timeout() -> Duration {
        Duration::from_secs(SUBMISSION_TIMEOUT_SECS)
    }

    pub fn weather_timeout() -> Duration {
        Duration::from_secs(WEATHER_TIMEOUT_SECS)
    }

    pub fn weather_interval() -> Duration {
        Duration::from_secs(WEATHER_INTERVAL_SECS)
    }
}

/// RSSI thresholds (dBm) for the signal quality label.
pub mod signal_strength {
    pub const EXCELLENT_MIN: i32 = -50;
    pub const GOOD_MIN: i32 = -60;
    pub const FAIR_MIN: i32 = -70;
}

/// Detections below this confidence are hidden from reports.
pub const MIN_DETECTION_CONFIDENCE: f64 = 0.4;

/// Default analysis service base URL.
pub const DEFAULT_ANALYSIS_BASE_URL: &str = "http://192.168.8.147:8080";

/// Default weather endpoint (weatherapi.com forecast shape).
///
/// Carries no API key; weatherapi.com answers 401/403 until `weather_url`
/// is configured with `key=...`.
pub const DEFAULT_WEATHER_URL: &str =
    "http://api.weatherapi.com/v1/forecast.json?q=Colombo&days=1";
