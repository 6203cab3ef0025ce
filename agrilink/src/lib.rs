//! Field sensor discovery and crop analysis submission.
//!
//! This crate provides the async core of a crop-management assistant:
//!
//! - Discovering ESP32 sensor nodes on the local Wi-Fi network
//! - Reading live temperature and humidity from a chosen node
//! - Merging the reading with the device location
//! - Submitting an image plus field data to a remote analysis service
//!
//! # Example
//!
//! ```no_run
//! use agrilink::{AgriConfig, FieldAssistant, NetworkSnapshot, WatchLocation, WatchNetworkInfo};
//! use std::sync::Arc;
//!
//! # async fn example() -> agrilink::Result<()> {
//! let network = Arc::new(WatchNetworkInfo::new(Some(NetworkSnapshot::wifi(
//!     "192.168.8.147",
//!     None,
//! ))));
//! let assistant = FieldAssistant::new(
//!     AgriConfig::load_or_default(),
//!     network,
//!     Arc::new(WatchLocation::default()),
//! )?;
//!
//! for device in assistant.scan_devices().await? {
//!     println!("{} at {} ({})", device.display_name(), device.ip_address, device.signal_quality());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Discovery
//!
//! A scan probes a fast-path address, a few mDNS hostnames and a bounded
//! slice of the local /24 concurrently. Every probe has its own timeout and
//! the whole scan has a deadline; probes still pending at the deadline are
//! cancelled, not just ignored.
//!
//! # Error Handling
//!
//! All operations return `Result<T, AgriError>`. Missing form inputs are
//! reported as [`ValidationFailure`]s before anything is sent.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`.

pub mod api;
pub mod core;
pub mod monitoring;
mod types;
mod util;

// Re-exported public API
pub use api::config::{AgriConfig, ScanConfig};
pub use api::field_assistant::FieldAssistant;
pub use api::models::{
    AgriError, AnalysisDraft, AnalysisReport, AnalysisRequest, AnalysisResult, CapturedImage,
    ConnectionType, Coordinates, Detection, DetectionInfo, DeviceDescriptor, GrowthStage,
    HerbicideOption, NetworkSnapshot, ProbeFailure, SensorReading, SensorSnapshot, SignalQuality,
    SoilType, ValidationFailure, WeatherIcon, WeatherReport,
};
pub use crate::core::probe::{DeviceProbe, HttpDeviceProbe};
pub use crate::core::scan::DeviceScanner;
pub use crate::core::session::DeviceSession;
pub use crate::core::submission::AnalysisSubmission;
pub use crate::core::weather::WeatherClient;
pub use monitoring::location::{LocationProvider, WatchLocation};
pub use monitoring::network::{NetworkInfoProvider, WatchNetworkInfo};

/// A specialized `Result` type for discovery and submission operations.
pub type Result<T> = std::result::Result<T, AgriError>;
