//! Discovery tests against a scripted probe.
//!
//! Time is paused, so deadlines and timeouts elapse instantly while keeping
//! their relative order.

mod common;

use agrilink::{AgriError, DeviceScanner, NetworkSnapshot, ScanConfig, WatchNetworkInfo};
use common::{StubProbe, descriptor};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn wifi() -> Arc<WatchNetworkInfo> {
    Arc::new(WatchNetworkInfo::new(Some(NetworkSnapshot::wifi(
        "192.168.8.147",
        Some("farm".into()),
    ))))
}

fn scanner(probe: Arc<StubProbe>, config: ScanConfig) -> DeviceScanner {
    DeviceScanner::new(wifi(), probe, config)
}

#[tokio::test(start_paused = true)]
async fn test_no_devices_returns_empty_list() {
    let probe = Arc::new(StubProbe::new());
    let scanner = scanner(Arc::clone(&probe), ScanConfig::default());

    let started = Instant::now();
    let devices = scanner.scan().await.unwrap();

    assert!(devices.is_empty());
    // fast path + 3 hostnames + 39 subnet hosts (.2 is the fast path)
    assert_eq!(probe.calls(), 43);
    assert!(started.elapsed() <= Duration::from_secs(8));
    assert!(!scanner.is_scanning());
}

#[tokio::test(start_paused = true)]
async fn test_fast_path_device_found_when_nothing_else_answers() {
    let probe = Arc::new(StubProbe::new().answer(
        "192.168.8.2",
        Duration::from_millis(300),
        descriptor("192.168.8.2", Some("esp32-dht11"), "ESP32-DHT11", Some(-58)),
    ));
    let config = ScanConfig::default().with_hostname_probe_timeout(Duration::from_secs(1));
    let scanner = scanner(Arc::clone(&probe), config);

    let started = Instant::now();
    let devices = scanner.scan().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].ip_address, "192.168.8.2");
    assert_eq!(devices[0].display_name(), "esp32-dht11");
    // Returns once every probe has resolved, well before the deadline.
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_abandons_hanging_probes() {
    let probe = Arc::new(
        StubProbe::new()
            .answer(
                "192.168.8.7",
                Duration::from_millis(200),
                descriptor("192.168.8.7", None, "ESP32", Some(-72)),
            )
            .ignoring_timeouts(),
    );
    let scanner = scanner(Arc::clone(&probe), ScanConfig::default());

    let started = Instant::now();
    let devices = scanner.scan().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].ip_address, "192.168.8.7");
    assert!(elapsed >= Duration::from_secs(8));
    assert!(elapsed < Duration::from_secs(9));
    assert_eq!(probe.in_flight(), 0, "pending probes must be dropped");
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_ips_are_collapsed() {
    // The fast path and a hostname both resolve to the same node.
    let probe = Arc::new(
        StubProbe::new()
            .answer(
                "192.168.8.2",
                Duration::from_millis(100),
                descriptor("192.168.8.2", None, "ESP32", Some(-65)),
            )
            .answer(
                "esp32-sensor.local",
                Duration::from_millis(400),
                descriptor("192.168.8.2", Some("esp32-sensor"), "ESP32-DHT11", Some(-48)),
            )
            .answer(
                "192.168.8.10",
                Duration::from_millis(50),
                descriptor("192.168.8.10", Some("esp-dht11"), "ESP32", None),
            ),
    );
    let scanner = scanner(Arc::clone(&probe), ScanConfig::default());

    let devices = scanner.scan().await.unwrap();

    let ips: Vec<&str> = devices.iter().map(|d| d.ip_address.as_str()).collect();
    assert_eq!(ips, vec!["192.168.8.2", "192.168.8.10"]);
    // Last answer for an IP wins.
    assert_eq!(devices[0].hostname.as_deref(), Some("esp32-sensor"));
    assert_eq!(devices[0].signal_strength, Some(-48));
}

#[tokio::test(start_paused = true)]
async fn test_non_wifi_network_sends_no_probes() {
    let network = Arc::new(WatchNetworkInfo::new(Some(NetworkSnapshot::other(Some(
        "10.64.1.9".into(),
    )))));
    let probe = Arc::new(StubProbe::new());
    let scanner = DeviceScanner::new(network, Arc::clone(&probe) as _, ScanConfig::default());

    let result = scanner.scan().await;

    assert!(matches!(result, Err(AgriError::NetworkUnsuitable(_))));
    assert_eq!(probe.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_network_sends_no_probes() {
    let network = Arc::new(WatchNetworkInfo::default());
    let probe = Arc::new(StubProbe::new());
    let scanner = DeviceScanner::new(network, Arc::clone(&probe) as _, ScanConfig::default());

    assert!(matches!(
        scanner.scan().await,
        Err(AgriError::NetworkUnsuitable(_))
    ));
    assert_eq!(probe.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_scan_is_rejected() {
    let probe = Arc::new(StubProbe::new());
    let scanner = scanner(Arc::clone(&probe), ScanConfig::default());

    let (first, second) = tokio::join!(scanner.scan(), scanner.scan());

    assert!(first.is_ok());
    assert!(matches!(second, Err(AgriError::ScanInProgress)));
    // Only the first scan probed anything.
    assert_eq!(probe.calls(), 43);

    // The flag is released once the first scan returns.
    assert!(scanner.scan().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_network_change_is_picked_up_by_next_scan() {
    let network = wifi();
    let probe = Arc::new(StubProbe::new().answer(
        "10.0.0.5",
        Duration::from_millis(100),
        descriptor("10.0.0.5", None, "ESP32", None),
    ));
    let config = ScanConfig::default()
        .with_fast_path_address(None)
        .with_hostnames(Vec::<String>::new())
        .with_host_range(1..=10);
    let scanner = DeviceScanner::new(Arc::clone(&network) as _, Arc::clone(&probe) as _, config);

    assert!(scanner.scan().await.unwrap().is_empty());

    network.publish(NetworkSnapshot::wifi("10.0.0.20", None));
    let devices = scanner.scan().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].ip_address, "10.0.0.5");
}
