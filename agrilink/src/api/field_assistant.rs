use log::debug;
use std::sync::Arc;
use tokio::sync::watch;

use crate::Result;
use crate::api::config::AgriConfig;
use crate::api::models::{
    AgriError, AnalysisDraft, AnalysisResult, DeviceDescriptor, NetworkSnapshot, SensorSnapshot,
    WeatherReport,
};
use crate::core::probe::{DeviceProbe, HttpDeviceProbe};
use crate::core::scan::DeviceScanner;
use crate::core::session::DeviceSession;
use crate::core::submission::AnalysisSubmission;
use crate::core::weather::WeatherClient;
use crate::monitoring::location::LocationProvider;
use crate::monitoring::network::NetworkInfoProvider;

/// High-level entry point for the sensor-assisted analysis flow.
///
/// Ties together the injected connectivity and location providers, device
/// discovery, sensor connection and the analysis upload.
///
/// # Example
///
/// ```no_run
/// use agrilink::{
///     AgriConfig, AnalysisDraft, FieldAssistant, GrowthStage, NetworkSnapshot, SoilType,
///     WatchLocation, WatchNetworkInfo,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> agrilink::Result<()> {
/// let network = Arc::new(WatchNetworkInfo::new(Some(NetworkSnapshot::wifi(
///     "192.168.8.147",
///     Some("farm".into()),
/// ))));
/// let location = Arc::new(WatchLocation::default());
/// let assistant = FieldAssistant::new(AgriConfig::default(), network, location)?;
///
/// let devices = assistant.scan_devices().await?;
/// if let Some(device) = devices.first() {
///     assistant.connect_device(device).await?;
/// }
///
/// let mut draft = AnalysisDraft::new();
/// draft.soil_type = Some(SoilType::Loamy);
/// draft.growth_stage = Some(GrowthStage::Early);
/// assistant.fill_draft(&mut draft);
/// # Ok(())
/// # }
/// ```
pub struct FieldAssistant {
    config: AgriConfig,
    network: Arc<dyn NetworkInfoProvider>,
    scanner: DeviceScanner,
    session: DeviceSession,
    submission: AnalysisSubmission,
    weather: WeatherClient,
    sensor_state: watch::Sender<Option<SensorSnapshot>>,
}

impl FieldAssistant {
    /// Creates an assistant that probes devices over HTTP.
    pub fn new(
        config: AgriConfig,
        network: Arc<dyn NetworkInfoProvider>,
        location: Arc<dyn LocationProvider>,
    ) -> Result<Self> {
        let client = build_client()?;
        let probe = Arc::new(HttpDeviceProbe::new(client.clone()));
        Ok(Self::assemble(config, network, location, probe, client))
    }

    /// Creates an assistant with a custom probe implementation.
    pub fn with_probe(
        config: AgriConfig,
        network: Arc<dyn NetworkInfoProvider>,
        location: Arc<dyn LocationProvider>,
        probe: Arc<dyn DeviceProbe>,
    ) -> Result<Self> {
        let client = build_client()?;
        Ok(Self::assemble(config, network, location, probe, client))
    }

    fn assemble(
        config: AgriConfig,
        network: Arc<dyn NetworkInfoProvider>,
        location: Arc<dyn LocationProvider>,
        probe: Arc<dyn DeviceProbe>,
        client: reqwest::Client,
    ) -> Self {
        let scanner = DeviceScanner::new(Arc::clone(&network), probe, config.scan.clone());
        let session = DeviceSession::new(client.clone(), location, config.sensor_timeout);
        let submission = AnalysisSubmission::new(
            client.clone(),
            config.analysis_base_url.clone(),
            config.submission_timeout,
        );
        let weather = WeatherClient::new(client, config.weather_url.clone(), config.weather_timeout);
        let (sensor_state, _rx) = watch::channel(None);

        Self {
            config,
            network,
            scanner,
            session,
            submission,
            weather,
            sensor_state,
        }
    }

    pub fn config(&self) -> &AgriConfig {
        &self.config
    }

    /// Latest connectivity snapshot, `None` if unknown.
    pub fn current_network(&self) -> Option<NetworkSnapshot> {
        self.network.current()
    }

    pub fn network_changes(&self) -> watch::Receiver<Option<NetworkSnapshot>> {
        self.network.subscribe()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanner.is_scanning()
    }

    /// Scans the local network for sensor devices.
    ///
    /// See [`DeviceScanner::scan`].
    pub async fn scan_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        self.scanner.scan().await
    }

    /// Reads the sensors of `device` and makes the result the current
    /// sensor state, replacing any earlier one.
    ///
    /// On failure the previous sensor state is left untouched.
    pub async fn connect_device(&self, device: &DeviceDescriptor) -> Result<SensorSnapshot> {
        let snapshot = self.session.connect(device).await?;
        self.sensor_state.send_replace(Some(snapshot));
        Ok(snapshot)
    }

    /// Sensor data from the most recent successful connection.
    pub fn sensor_state(&self) -> Option<SensorSnapshot> {
        *self.sensor_state.borrow()
    }

    pub fn sensor_changes(&self) -> watch::Receiver<Option<SensorSnapshot>> {
        self.sensor_state.subscribe()
    }

    /// Forgets the current sensor data, e.g. on form reset.
    pub fn clear_sensor_state(&self) {
        debug!("Clearing sensor state");
        self.sensor_state.send_replace(None);
    }

    /// Copies the current sensor state into `draft`.
    ///
    /// Returns `false` when no device has been connected yet.
    pub fn fill_draft(&self, draft: &mut AnalysisDraft) -> bool {
        match self.sensor_state() {
            Some(snapshot) => {
                draft.apply_sensor(&snapshot);
                true
            }
            None => false,
        }
    }

    /// Validates and uploads `draft`. See [`AnalysisSubmission::submit`].
    pub async fn submit_analysis(&self, draft: &AnalysisDraft) -> Result<AnalysisResult> {
        self.submission.submit(draft).await
    }

    pub async fn fetch_weather(&self) -> Result<WeatherReport> {
        self.weather.fetch().await
    }

    /// Starts refreshing the weather report at the configured interval.
    pub fn watch_weather(&self) -> watch::Receiver<Option<WeatherReport>> {
        self.weather.watch(self.config.weather_interval)
    }
}

fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("agrilink/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AgriError::Config(format!("failed to build HTTP client: {e}")))
}
