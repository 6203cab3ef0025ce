//! Reading live sensor data from a chosen device.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::Result;
use crate::api::models::{AgriError, DeviceDescriptor, SensorReading, SensorSnapshot};
use crate::monitoring::location::LocationProvider;
use crate::types::constants::endpoints;
use crate::util::utils::device_url;

/// Connects to a discovered device and reads its sensors.
///
/// A connection is a single `GET http://<ip>/api/sensor`; nothing is kept
/// open afterwards. Failures are reported once and never retried here.
#[derive(Clone)]
pub struct DeviceSession {
    client: reqwest::Client,
    location: Arc<dyn LocationProvider>,
    timeout: Duration,
}

impl DeviceSession {
    pub fn new(
        client: reqwest::Client,
        location: Arc<dyn LocationProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            location,
            timeout,
        }
    }

    /// Fetches a reading from `device` and merges it with the current location.
    ///
    /// # Errors
    ///
    /// Returns [`AgriError::ConnectFailure`] on timeout, transport error,
    /// non-2xx status or an unparseable body.
    pub async fn connect(&self, device: &DeviceDescriptor) -> Result<SensorSnapshot> {
        let reading = match tokio::time::timeout(self.timeout, self.read_sensor(device)).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                warn!(
                    "Sensor read from {} timed out after {:?}",
                    device.ip_address, self.timeout
                );
                return Err(AgriError::ConnectFailure(format!(
                    "no response from {} within {:?}",
                    device.display_name(),
                    self.timeout
                )));
            }
        };

        let location = self.location.current();
        if location.is_none() {
            debug!("No location fix available, continuing without coordinates");
        }

        info!(
            "Connected to {} ({}): {:.1}°C, {:.1}%",
            device.display_name(),
            device.ip_address,
            reading.temperature,
            reading.humidity
        );

        Ok(SensorSnapshot { reading, location })
    }

    async fn read_sensor(&self, device: &DeviceDescriptor) -> Result<SensorReading> {
        let url = device_url(&device.ip_address, endpoints::DEVICE_SENSOR);
        debug!("Reading sensor data from {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AgriError::ConnectFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgriError::ConnectFailure(format!(
                "HTTP error, status: {status}"
            )));
        }

        // A failed DHT read is reported as `null`, which fails here too.
        response
            .json()
            .await
            .map_err(|e| AgriError::ConnectFailure(format!("invalid sensor data: {e}")))
    }
}
