//! Current weather and field advisories.
//!
//! The home screen shows current conditions refreshed on an interval. The
//! endpoint follows the weatherapi.com forecast schema.

use log::{debug, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::Result;
use crate::api::models::{AgriError, WeatherReport};

/// Shortest refresh interval accepted by [`WeatherClient::watch`].
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WeatherClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    /// Fetches the current conditions once, bounded by the request timeout.
    pub async fn fetch(&self) -> Result<WeatherReport> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgriError::Weather(format!("no response within {:?}", self.timeout))
                } else {
                    AgriError::Weather(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AgriError::Weather(format!(
                "HTTP {status}, configure weather_url with a valid key= parameter"
            )));
        }
        if !status.is_success() {
            return Err(AgriError::Weather(format!("HTTP {status}")));
        }

        let payload: WeatherPayload = response
            .json()
            .await
            .map_err(|e| AgriError::Weather(format!("unexpected body: {e}")))?;

        Ok(payload.into_report())
    }

    /// Refreshes the report every `interval` in a background task.
    ///
    /// The first fetch happens immediately. A failed refresh keeps the
    /// previous report. The task stops once every receiver is dropped, even
    /// while a fetch is in flight.
    pub fn watch(&self, interval: Duration) -> watch::Receiver<Option<WeatherReport>> {
        self.spawn_refresh(interval).0
    }

    fn spawn_refresh(
        &self,
        interval: Duration,
    ) -> (watch::Receiver<Option<WeatherReport>>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(None);
        let client = self.clone();
        let interval = interval.max(MIN_REFRESH_INTERVAL);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        debug!("Weather watchers gone, stopping refresh");
                        break;
                    }
                    _ = ticker.tick() => {
                        let outcome = tokio::select! {
                            _ = tx.closed() => {
                                debug!("Weather watchers gone during refresh, stopping");
                                break;
                            }
                            outcome = client.fetch() => outcome,
                        };
                        match outcome {
                            Ok(report) => {
                                debug!("Weather refreshed: {} {}°C", report.condition, report.temperature_c);
                                tx.send_replace(Some(report));
                            }
                            Err(e) => warn!("Weather refresh failed: {e}"),
                        }
                    }
                }
            }
        });

        (rx, task)
    }
}

#[derive(Debug, Deserialize)]
struct WeatherPayload {
    current: CurrentPayload,
    location: LocationPayload,
    #[serde(default)]
    alerts: Option<AlertsPayload>,
}

#[derive(Debug, Deserialize)]
struct CurrentPayload {
    condition: ConditionPayload,
    temp_c: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionPayload {
    text: String,
}

#[derive(Debug, Deserialize)]
struct LocationPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlertsPayload {
    #[serde(default)]
    alert: Vec<AlertPayload>,
}

#[derive(Debug, Deserialize)]
struct AlertPayload {
    headline: Option<String>,
    desc: Option<String>,
}

impl WeatherPayload {
    fn into_report(self) -> WeatherReport {
        let advisory = self
            .alerts
            .into_iter()
            .flat_map(|a| a.alert)
            .find_map(|a| {
                let non_empty = |s: &String| !s.is_empty();
                a.headline.filter(non_empty).or(a.desc.filter(non_empty))
            });

        WeatherReport {
            condition: self.current.condition.text,
            temperature_c: self.current.temp_c,
            humidity: self.current.humidity,
            location: self.location.name,
            advisory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::WeatherIcon;

    #[test]
    fn parses_weatherapi_body() {
        let body = r#"{
            "location": {"name": "Colombo", "country": "Sri Lanka"},
            "current": {"temp_c": 29.4, "humidity": 79, "condition": {"text": "Patchy rain nearby"}},
            "alerts": {"alert": [{"headline": "Heavy rain expected", "desc": "Avoid spraying"}]}
        }"#;
        let payload: WeatherPayload = serde_json::from_str(body).unwrap();
        let report = payload.into_report();
        assert_eq!(report.location, "Colombo");
        assert_eq!(report.temperature_c, 29.4);
        assert_eq!(report.humidity, 79.0);
        assert_eq!(report.advisory.as_deref(), Some("Heavy rain expected"));
        assert_eq!(report.icon(), WeatherIcon::Rainy);
    }

    /// Accepts connections but never answers.
    async fn silent_listener() -> (tokio::net::TcpListener, String) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/forecast", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn refresh_task_stops_when_watchers_leave_mid_fetch() {
        let (_listener, url) = silent_listener().await;
        let client = WeatherClient::new(reqwest::Client::new(), url, Duration::from_secs(3600));

        let (rx, task) = client.spawn_refresh(Duration::from_secs(60));
        // Let the first fetch get stuck waiting for a response.
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(rx);

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("refresh task kept running after its receivers were dropped")
            .unwrap();
    }

    #[test]
    fn advisory_is_optional() {
        let body = r#"{
            "location": {"name": "Kandy"},
            "current": {"temp_c": 24.0, "humidity": 60, "condition": {"text": "Sunny"}}
        }"#;
        let report = serde_json::from_str::<WeatherPayload>(body)
            .unwrap()
            .into_report();
        assert_eq!(report.advisory, None);
    }
}
