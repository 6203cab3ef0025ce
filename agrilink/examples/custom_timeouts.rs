/// Example demonstrating a wider, slower scan for congested field networks.
///
/// Sensor nodes on weak links can take longer than the default one second
/// to answer, and some installs put them outside the first 40 addresses.
use agrilink::{
    AgriConfig, FieldAssistant, NetworkSnapshot, ScanConfig, WatchLocation, WatchNetworkInfo,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> agrilink::Result<()> {
    let scan = ScanConfig::new()
        .with_probe_timeout(Duration::from_secs(2))
        .with_hostname_probe_timeout(Duration::from_secs(3))
        .with_scan_deadline(Duration::from_secs(15))
        .with_host_range(1..=120);

    let config = AgriConfig::new()
        .with_scan(scan)
        .with_sensor_timeout(Duration::from_secs(10));

    println!("Scan configured with:");
    println!("  Probe timeout:    {:?}", config.scan.probe_timeout);
    println!("  Hostname timeout: {:?}", config.scan.hostname_probe_timeout);
    println!("  Deadline:         {:?}", config.scan.scan_deadline);
    println!("  Host range:       {:?}", config.scan.host_range);

    let network = Arc::new(WatchNetworkInfo::new(Some(NetworkSnapshot::wifi(
        "192.168.8.147",
        Some("farm".to_string()),
    ))));
    let assistant = FieldAssistant::new(config, network, Arc::new(WatchLocation::default()))?;

    let devices = assistant.scan_devices().await?;
    println!("\nFound {} device(s)", devices.len());

    Ok(())
}
