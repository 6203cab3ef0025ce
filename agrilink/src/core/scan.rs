//! Sensor device discovery on the local network.
//!
//! A scan probes the fast-path address, the known mDNS hostnames and a slice
//! of the local /24 concurrently, and races them against one overall
//! deadline. Probes still pending at the deadline are cancelled and dropped.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::api::config::ScanConfig;
use crate::api::models::{AgriError, ConnectionType, DeviceDescriptor, NetworkSnapshot};
use crate::core::probe::DeviceProbe;
use crate::monitoring::network::NetworkInfoProvider;
use crate::util::utils::{subnet_hosts, subnet_prefix};

/// One address to probe and the timeout it gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub address: String,
    pub timeout: Duration,
}

/// Discovers sensor devices reachable from the current Wi-Fi network.
///
/// Only one scan runs at a time; a concurrent call fails with
/// [`AgriError::ScanInProgress`].
pub struct DeviceScanner {
    network: Arc<dyn NetworkInfoProvider>,
    probe: Arc<dyn DeviceProbe>,
    config: ScanConfig,
    busy: AtomicBool,
}

impl DeviceScanner {
    pub fn new(
        network: Arc<dyn NetworkInfoProvider>,
        probe: Arc<dyn DeviceProbe>,
        config: ScanConfig,
    ) -> Self {
        Self {
            network,
            probe,
            config,
            busy: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Whether a scan is currently running.
    pub fn is_scanning(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Runs one discovery scan.
    ///
    /// Returns the discovered devices, unique by IP address and sorted by
    /// address. An empty list means nothing answered and is not an error.
    ///
    /// # Errors
    ///
    /// - [`AgriError::ScanInProgress`] if another scan is running.
    /// - [`AgriError::NetworkUnsuitable`] if the device is not on Wi-Fi with
    ///   an IPv4 address. No probe is sent in that case.
    pub async fn scan(&self) -> Result<Vec<DeviceDescriptor>> {
        let _busy = BusyGuard::acquire(&self.busy).ok_or(AgriError::ScanInProgress)?;

        let local_ip = scannable_address(self.network.current().as_ref())?;
        let candidates = build_candidates(&self.config, local_ip);
        let [a, b, c] = subnet_prefix(local_ip);
        info!(
            "Scanning {a}.{b}.{c}.0/24 ({} candidates, deadline {:?})",
            candidates.len(),
            self.config.scan_deadline
        );

        let started = Instant::now();
        let devices = self.race_probes(candidates).await;
        info!(
            "Scan finished in {:?}: {} device(s) found",
            started.elapsed(),
            devices.len()
        );

        Ok(devices)
    }

    async fn race_probes(&self, candidates: Vec<Candidate>) -> Vec<DeviceDescriptor> {
        let cancel = CancellationToken::new();

        let mut pending: FuturesUnordered<_> = candidates
            .into_iter()
            .map(|candidate| {
                let probe = Arc::clone(&self.probe);
                let cancel = cancel.clone();
                async move {
                    let outcome = probe
                        .probe(&candidate.address, candidate.timeout, &cancel)
                        .await;
                    (candidate.address, outcome)
                }
            })
            .collect();

        // Keyed by IP in arrival order, so the last answer per IP wins.
        let mut found: HashMap<String, DeviceDescriptor> = HashMap::new();

        let deadline = tokio::time::sleep(self.config.scan_deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(
                        "Scan deadline reached, abandoning {} pending probe(s)",
                        pending.len()
                    );
                    cancel.cancel();
                    break;
                }
                next = pending.next() => match next {
                    Some((address, Ok(device))) => {
                        debug!("Found {} ({}) via {address}", device.display_name(), device.ip_address);
                        found.insert(device.ip_address.clone(), device);
                    }
                    Some((_, Err(_))) => {}
                    None => {
                        debug!("All probes resolved before the deadline");
                        break;
                    }
                },
            }
        }

        // Releases whatever the abandoned probes still hold.
        drop(pending);

        let mut devices: Vec<DeviceDescriptor> = found.into_values().collect();
        devices.sort_by(|x, y| {
            sort_key(&x.ip_address)
                .cmp(&sort_key(&y.ip_address))
                .then_with(|| x.ip_address.cmp(&y.ip_address))
        });
        devices
    }
}

fn sort_key(ip: &str) -> Option<Ipv4Addr> {
    ip.parse().ok()
}

/// Checks that a snapshot allows scanning and returns the local address.
pub(crate) fn scannable_address(snapshot: Option<&NetworkSnapshot>) -> Result<Ipv4Addr> {
    let Some(snapshot) = snapshot else {
        return Err(AgriError::NetworkUnsuitable(
            "network state is unknown".into(),
        ));
    };

    if !snapshot.is_connected || snapshot.connection_type != ConnectionType::Wifi {
        return Err(AgriError::NetworkUnsuitable(
            "please connect to a WiFi network to scan for devices".into(),
        ));
    }

    snapshot.ipv4().ok_or_else(|| {
        AgriError::NetworkUnsuitable(format!(
            "no usable IPv4 address on the WiFi link ({:?})",
            snapshot.ip_address
        ))
    })
}

/// Builds the ordered candidate list: fast path, hostnames, then the subnet.
///
/// Each address appears once, with the timeout of its first occurrence.
pub(crate) fn build_candidates(config: &ScanConfig, local_ip: Ipv4Addr) -> Vec<Candidate> {
    let named = config
        .fast_path_address
        .iter()
        .chain(config.hostnames.iter())
        .map(|address| Candidate {
            address: address.clone(),
            timeout: config.hostname_probe_timeout,
        });

    let subnet = subnet_hosts(subnet_prefix(local_ip), config.host_range.clone())
        .into_iter()
        .map(|address| Candidate {
            address,
            timeout: config.probe_timeout,
        });

    let mut seen = HashSet::new();
    named
        .chain(subnet)
        .filter(|candidate| seen.insert(candidate.address.clone()))
        .collect()
}

/// Holds the scanner's busy flag for the duration of one scan.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 8, 147)
    }

    #[test]
    fn candidates_in_order_with_timeouts() {
        let config = ScanConfig::default().with_host_range(1..=3);
        let candidates = build_candidates(&config, local());
        let addresses: Vec<&str> = candidates.iter().map(|c| c.address.as_str()).collect();

        // 192.168.8.2 is both the fast path and a subnet host; probed once.
        assert_eq!(
            addresses,
            vec![
                "192.168.8.2",
                "esp32-dht11.local",
                "esp32-sensor.local",
                "esp-dht11.local",
                "192.168.8.1",
                "192.168.8.3",
            ]
        );
        assert_eq!(candidates[0].timeout, Duration::from_secs(2));
        assert_eq!(candidates[1].timeout, Duration::from_secs(2));
        assert_eq!(candidates[4].timeout, Duration::from_secs(1));
    }

    #[test]
    fn default_range_is_bounded() {
        let config = ScanConfig::default()
            .with_fast_path_address(None)
            .with_hostnames(Vec::<String>::new());
        assert_eq!(build_candidates(&config, local()).len(), 40);
    }

    #[test]
    fn unknown_network_is_unsuitable() {
        assert!(matches!(
            scannable_address(None),
            Err(AgriError::NetworkUnsuitable(_))
        ));
    }

    #[test]
    fn cellular_is_unsuitable() {
        let snap = NetworkSnapshot::other(Some("10.20.30.40".into()));
        assert!(matches!(
            scannable_address(Some(&snap)),
            Err(AgriError::NetworkUnsuitable(_))
        ));
    }

    #[test]
    fn disconnected_wifi_is_unsuitable() {
        let mut snap = NetworkSnapshot::wifi("192.168.8.147", None);
        snap.is_connected = false;
        assert!(scannable_address(Some(&snap)).is_err());
    }

    #[test]
    fn wifi_without_ipv4_is_unsuitable() {
        let mut snap = NetworkSnapshot::wifi("fe80::1", None);
        assert!(scannable_address(Some(&snap)).is_err());
        snap.ip_address = None;
        assert!(scannable_address(Some(&snap)).is_err());
    }

    #[test]
    fn wifi_with_ipv4_is_scannable() {
        let snap = NetworkSnapshot::wifi("192.168.8.147", Some("farm".into()));
        assert_eq!(scannable_address(Some(&snap)).unwrap(), local());
    }

    #[test]
    fn busy_guard_is_exclusive_and_released() {
        let flag = AtomicBool::new(false);
        let guard = BusyGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(BusyGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(BusyGuard::acquire(&flag).is_some());
    }
}
