//! Single-address device probing.
//!
//! A probe asks one candidate host "are you a sensor device, and what are
//! you" by fetching its descriptor endpoint. Every way this can go wrong
//! collapses into [`ProbeFailure`].

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::api::models::{DeviceDescriptor, ProbeFailure};
use crate::try_log;
use crate::types::constants::endpoints;
use crate::util::utils::{device_url, is_ipv4_literal};

/// Probes one address for a sensor device.
///
/// Implementations must give up once `timeout` elapses or `cancel` fires,
/// and must release any in-flight work when they do.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    async fn probe(
        &self,
        address: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<DeviceDescriptor, ProbeFailure>;
}

/// Probes over HTTP: `GET http://<address>/api/info`.
#[derive(Debug, Clone, Default)]
pub struct HttpDeviceProbe {
    client: reqwest::Client,
}

impl HttpDeviceProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, address: &str) -> Result<DeviceDescriptor, ProbeFailure> {
        let url = device_url(address, endpoints::DEVICE_INFO);
        let response = self.client.get(&url).send().await.map_err(|e| {
            debug!("Probe {url} failed: {e}");
            ProbeFailure
        })?;

        let status = response.status();
        if !status.is_success() {
            debug!("Probe {url} answered {status}");
            return Err(ProbeFailure);
        }

        let body = response.bytes().await.map_err(|e| {
            debug!("Probe {url} body read failed: {e}");
            ProbeFailure
        })?;

        parse_descriptor(&body, address).ok_or(ProbeFailure)
    }
}

#[async_trait]
impl DeviceProbe for HttpDeviceProbe {
    async fn probe(
        &self,
        address: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<DeviceDescriptor, ProbeFailure> {
        // Dropping the request future aborts the underlying connection.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Probe of {address} cancelled");
                Err(ProbeFailure)
            }
            result = tokio::time::timeout(timeout, self.fetch(address)) => match result {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!("Probe of {address} timed out after {timeout:?}");
                    Err(ProbeFailure)
                }
            },
        }
    }
}

/// Wire shape of the descriptor endpoint.
#[derive(Debug, Deserialize)]
struct DeviceInfoPayload {
    hostname: Option<String>,
    ip: Option<String>,
    device_type: Option<String>,
    rssi: Option<i32>,
    mac: Option<String>,
}

/// Parses a descriptor body.
///
/// When the device omits its own `ip`, the probed address is used if it is a
/// literal IPv4 address; a hostname is not a usable key.
pub(crate) fn parse_descriptor(body: &[u8], address: &str) -> Option<DeviceDescriptor> {
    let payload: DeviceInfoPayload = try_log!(
        serde_json::from_slice(body),
        format!("Malformed descriptor from {address}")
    );

    let ip_address = match payload.ip.filter(|ip| !ip.is_empty()) {
        Some(ip) => ip,
        None if is_ipv4_literal(address) => address.to_string(),
        None => {
            debug!("Descriptor from {address} carries no ip");
            return None;
        }
    };

    Some(DeviceDescriptor {
        hostname: payload.hostname.filter(|h| !h.is_empty()),
        ip_address,
        device_type: payload.device_type.unwrap_or_default(),
        signal_strength: payload.rssi,
        mac_address: payload.mac.filter(|m| !m.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_descriptor() {
        let body = br#"{"hostname":"esp32-dht11","ip":"192.168.8.2","device_type":"dht11","rssi":-48,"mac":"24:6F:28:AA:BB:CC"}"#;
        let dev = parse_descriptor(body, "esp32-dht11.local").unwrap();
        assert_eq!(dev.hostname.as_deref(), Some("esp32-dht11"));
        assert_eq!(dev.ip_address, "192.168.8.2");
        assert_eq!(dev.device_type, "dht11");
        assert_eq!(dev.signal_strength, Some(-48));
        assert_eq!(dev.mac_address.as_deref(), Some("24:6F:28:AA:BB:CC"));
    }

    #[test]
    fn optional_fields_stay_absent() {
        let dev = parse_descriptor(br#"{"ip":"192.168.8.7"}"#, "192.168.8.7").unwrap();
        assert_eq!(dev.hostname, None);
        assert_eq!(dev.signal_strength, None);
        assert_eq!(dev.mac_address, None);
        assert_eq!(dev.device_type, "");
    }

    #[test]
    fn missing_ip_falls_back_to_literal_address() {
        let dev = parse_descriptor(br#"{"device_type":"dht11"}"#, "192.168.8.9").unwrap();
        assert_eq!(dev.ip_address, "192.168.8.9");
    }

    #[test]
    fn missing_ip_from_hostname_is_rejected() {
        assert!(parse_descriptor(br#"{"device_type":"dht11"}"#, "esp-dht11.local").is_none());
    }

    #[test]
    fn malformed_body_is_rejected() {
        assert!(parse_descriptor(b"<html>router login</html>", "192.168.8.1").is_none());
        assert!(parse_descriptor(br#"{"rssi":"strong"}"#, "192.168.8.1").is_none());
    }

    #[tokio::test]
    async fn cancelled_probe_fails_immediately() {
        let probe = HttpDeviceProbe::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        // TEST-NET-1 is never routable; only the cancellation can end this quickly.
        let result = probe
            .probe("192.0.2.1", Duration::from_secs(30), &cancel)
            .await;
        assert_eq!(result, Err(ProbeFailure));
    }
}
