//! Data types for discovery, sensor readings and analysis submission.
//!
//! Report types mirror the analysis service's camelCase JSON and tolerate
//! missing or extra fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::types::constants::{MIN_DETECTION_CONFIDENCE, signal_strength};

/// A sensor node found on the local network.
///
/// Descriptors are produced by a single successful probe and only live as
/// long as the scan result that holds them. Within one result set the
/// `ip_address` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    /// Human-readable name reported by the device, if any.
    pub hostname: Option<String>,
    /// Dotted-quad address; the deduplication key.
    pub ip_address: String,
    /// Free-text classification reported by the firmware (e.g. `dht11`).
    pub device_type: String,
    /// RSSI in dBm.
    pub signal_strength: Option<i32>,
    /// Hardware address. Informational only.
    pub mac_address: Option<String>,
}

impl DeviceDescriptor {
    /// Name to show in a device list.
    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or("ESP32 Device")
    }

    /// Coarse quality label for the reported RSSI.
    pub fn signal_quality(&self) -> SignalQuality {
        SignalQuality::from_rssi(self.signal_strength)
    }
}

/// Coarse signal quality derived from RSSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    Unknown,
}

impl SignalQuality {
    pub fn from_rssi(rssi: Option<i32>) -> Self {
        match rssi {
            None => Self::Unknown,
            Some(r) if r >= signal_strength::EXCELLENT_MIN => Self::Excellent,
            Some(r) if r >= signal_strength::GOOD_MIN => Self::Good,
            Some(r) if r >= signal_strength::FAIR_MIN => Self::Fair,
            Some(_) => Self::Poor,
        }
    }
}

impl Display for SignalQuality {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "Excellent"),
            Self::Good => write!(f, "Good"),
            Self::Fair => write!(f, "Fair"),
            Self::Poor => write!(f, "Poor"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Temperature/humidity pair read from a sensor node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

/// A latitude/longitude fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A sensor reading merged with the device location at connect time.
///
/// `location` is `None` when the location permission was denied or no fix
/// was available.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSnapshot {
    pub reading: SensorReading,
    pub location: Option<Coordinates>,
}

/// Kind of the active network link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Wifi,
    Other,
}

impl Display for ConnectionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wifi => write!(f, "wifi"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Connectivity state as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub is_connected: bool,
    pub connection_type: ConnectionType,
    pub ip_address: Option<String>,
    pub ssid: Option<String>,
}

impl NetworkSnapshot {
    /// A connected Wi-Fi link with the given local address.
    pub fn wifi(ip_address: impl Into<String>, ssid: Option<String>) -> Self {
        Self {
            is_connected: true,
            connection_type: ConnectionType::Wifi,
            ip_address: Some(ip_address.into()),
            ssid,
        }
    }

    /// A connected non-Wi-Fi link (cellular, ethernet, ...).
    pub fn other(ip_address: Option<String>) -> Self {
        Self {
            is_connected: true,
            connection_type: ConnectionType::Other,
            ip_address,
            ssid: None,
        }
    }

    /// The local address parsed as IPv4, if present and valid.
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        self.ip_address.as_deref()?.parse().ok()
    }
}

/// Soil category selected by the farmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilType {
    Sandy,
    Clay,
    Loamy,
}

impl SoilType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandy => "sandy",
            Self::Clay => "clay",
            Self::Loamy => "loamy",
        }
    }
}

impl FromStr for SoilType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandy" => Ok(Self::Sandy),
            "clay" => Ok(Self::Clay),
            "loamy" => Ok(Self::Loamy),
            other => Err(format!("unknown soil type '{other}'")),
        }
    }
}

impl Display for SoilType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crop growth stage selected by the farmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthStage {
    Early,
    Mature,
}

impl GrowthStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Mature => "mature",
        }
    }
}

impl FromStr for GrowthStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "early" => Ok(Self::Early),
            "mature" => Ok(Self::Mature),
            other => Err(format!("unknown growth stage '{other}'")),
        }
    }
}

impl Display for GrowthStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A photo taken or picked for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Reference handed back to the results view.
    pub uri: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl CapturedImage {
    pub fn new(uri: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_type_for(&file_name).to_string();
        Self {
            uri: uri.into(),
            file_name,
            mime_type,
            bytes,
        }
    }

    /// Reads an image file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(path.display().to_string(), file_name, bytes))
    }
}

fn mime_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// The analysis form as the user fills it in.
///
/// Every input arrives from a different source at a different time, so all
/// of them are optional here. Use [`AnalysisDraft::to_request`] to obtain a
/// complete [`AnalysisRequest`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisDraft {
    pub image: Option<CapturedImage>,
    pub soil_type: Option<SoilType>,
    pub growth_stage: Option<GrowthStage>,
    pub use_new_model: bool,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub location: Option<Coordinates>,
}

impl AnalysisDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly connected sensor snapshot, replacing any previous one.
    pub fn apply_sensor(&mut self, snapshot: &SensorSnapshot) {
        self.temperature = Some(snapshot.reading.temperature);
        self.humidity = Some(snapshot.reading.humidity);
        self.location = snapshot.location;
    }

    /// Clears every field, including sensor data.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Required inputs still missing, in the order they are checked.
    pub fn missing_fields(&self) -> Vec<ValidationFailure> {
        let mut missing = Vec::new();
        if self.image.is_none() {
            missing.push(ValidationFailure::MissingImage);
        }
        if self.soil_type.is_none() {
            missing.push(ValidationFailure::MissingSoilType);
        }
        if self.growth_stage.is_none() {
            missing.push(ValidationFailure::MissingGrowthStage);
        }
        if self.temperature.is_none() {
            missing.push(ValidationFailure::MissingTemperature);
        }
        if self.humidity.is_none() {
            missing.push(ValidationFailure::MissingHumidity);
        }
        missing
    }

    pub fn is_submittable(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Builds the outbound request, or reports the first missing input.
    pub fn to_request(&self) -> Result<AnalysisRequest, ValidationFailure> {
        let (Some(image), Some(soil_type), Some(growth_stage), Some(temperature), Some(humidity)) = (
            self.image.as_ref(),
            self.soil_type,
            self.growth_stage,
            self.temperature,
            self.humidity,
        ) else {
            return Err(self.missing_fields()[0]);
        };

        Ok(AnalysisRequest {
            image: image.clone(),
            soil_type,
            growth_stage,
            use_new_model: self.use_new_model,
            sensor: SensorSnapshot {
                reading: SensorReading {
                    temperature,
                    humidity,
                },
                location: self.location,
            },
        })
    }
}

/// A complete analysis submission.
///
/// Only obtainable through [`AnalysisDraft::to_request`], so every field is
/// guaranteed present.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    image: CapturedImage,
    soil_type: SoilType,
    growth_stage: GrowthStage,
    use_new_model: bool,
    sensor: SensorSnapshot,
}

impl AnalysisRequest {
    pub fn image(&self) -> &CapturedImage {
        &self.image
    }

    pub fn soil_type(&self) -> SoilType {
        self.soil_type
    }

    pub fn growth_stage(&self) -> GrowthStage {
        self.growth_stage
    }

    pub fn use_new_model(&self) -> bool {
        self.use_new_model
    }

    pub fn sensor(&self) -> &SensorSnapshot {
        &self.sensor
    }
}

/// One herbicide suggested by the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HerbicideOption {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub application_rate: Option<String>,
    #[serde(default)]
    pub mode_of_action: Option<String>,
    #[serde(default)]
    pub application_method: Option<String>,
    #[serde(default)]
    pub weather_constraints: Option<String>,
    #[serde(default)]
    pub safe_for_tomato: Option<Value>,
    #[serde(default)]
    pub resistance_reported: Option<Value>,
}

impl HerbicideOption {
    pub fn is_safe_for_tomato(&self) -> bool {
        self.safe_for_tomato.as_ref().is_some_and(truthy)
    }

    pub fn has_reported_resistance(&self) -> bool {
        self.resistance_reported.as_ref().is_some_and(truthy)
    }
}

/// The service sends booleans either as JSON booleans or as `"true"` strings.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// A single object detected in the submitted image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    #[serde(default)]
    pub class_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub bbox: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionInfo {
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub model_used: Option<String>,
}

/// Body returned by the analysis service.
///
/// The schema is owned by the service; known fields are typed and every
/// other field is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(default)]
    pub weed_name: Option<String>,
    /// Percentage in `0..=100`, unlike detection confidences which are fractions.
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub predicted_herbicide_name: Option<String>,
    #[serde(default)]
    pub predicted_application_rate: Option<Value>,
    #[serde(default)]
    pub herbicide_options: Vec<HerbicideOption>,
    #[serde(default)]
    pub detection_info: Option<DetectionInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisReport {
    /// Application rate as display text, whether sent as number or string.
    pub fn application_rate(&self) -> Option<String> {
        match self.predicted_application_rate.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// An analysis response paired with the image that produced it.
///
/// The service does not echo the image back, so the reference is attached
/// on the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub captured_image_uri: String,
}

impl AnalysisResult {
    /// Detections confident enough to be shown.
    pub fn confident_detections(&self) -> Vec<&Detection> {
        self.report
            .detection_info
            .iter()
            .flat_map(|info| info.detections.iter())
            .filter(|d| d.confidence >= MIN_DETECTION_CONFIDENCE)
            .collect()
    }
}

/// Current conditions from the weather endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub condition: String,
    pub temperature_c: f64,
    pub humidity: f64,
    pub location: String,
    pub advisory: Option<String>,
}

impl WeatherReport {
    pub fn icon(&self) -> WeatherIcon {
        WeatherIcon::from_condition(&self.condition)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherIcon {
    Sunny,
    Rainy,
    Cloudy,
    Other,
}

impl WeatherIcon {
    pub fn from_condition(condition: &str) -> Self {
        let condition = condition.to_lowercase();
        if condition.contains("sunny") {
            Self::Sunny
        } else if condition.contains("rain") {
            Self::Rainy
        } else if condition.contains("cloud") {
            Self::Cloudy
        } else {
            Self::Other
        }
    }
}

/// A required analysis input that is missing.
///
/// Each variant carries the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("please capture or select an image")]
    MissingImage,
    #[error("please select a soil type")]
    MissingSoilType,
    #[error("please select a growth stage")]
    MissingGrowthStage,
    #[error("temperature reading is missing, connect a sensor device")]
    MissingTemperature,
    #[error("humidity reading is missing, connect a sensor device")]
    MissingHumidity,
}

/// A single probe found no usable sensor device.
///
/// Timeouts, refused connections, bad status codes and malformed bodies all
/// map here; discovery does not care which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no sensor device answered")]
pub struct ProbeFailure;

/// Errors that can occur during discovery, connection and submission.
///
/// # Example
///
/// ```no_run
/// use agrilink::{AgriError, FieldAssistant};
///
/// # async fn example(assistant: FieldAssistant) {
/// match assistant.scan_devices().await {
///     Ok(devices) if devices.is_empty() => println!("No devices found"),
///     Ok(devices) => println!("Found {} devices", devices.len()),
///     Err(AgriError::NetworkUnsuitable(why)) => eprintln!("WiFi required: {why}"),
///     Err(e) => eprintln!("Scan failed: {e}"),
/// }
/// # }
/// ```
#[derive(Debug, Error)]
pub enum AgriError {
    /// The active network is not Wi-Fi or has no usable address.
    #[error("network unsuitable for scanning: {0}")]
    NetworkUnsuitable(String),

    /// Another scan is still running.
    #[error("a device scan is already in progress")]
    ScanInProgress,

    /// The chosen device did not return valid sensor data.
    #[error("failed to connect to device: {0}")]
    ConnectFailure(String),

    /// A required input is missing; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// The analysis upload failed.
    #[error("{0}")]
    SubmissionFailure(String),

    /// The weather endpoint could not be read.
    #[error("weather unavailable: {0}")]
    Weather(String),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgriError {
    /// Whether the user can simply try the same action again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailure(_) | Self::SubmissionFailure(_) | Self::Weather(_)
        )
    }
}
