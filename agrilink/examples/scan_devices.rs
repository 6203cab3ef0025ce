use agrilink::{AgriConfig, FieldAssistant, NetworkSnapshot, WatchLocation, WatchNetworkInfo};
use std::sync::Arc;

#[tokio::main]
async fn main() -> agrilink::Result<()> {
    let local_ip = std::env::args().nth(1).unwrap_or_else(|| "192.168.8.147".to_string());

    let network = Arc::new(WatchNetworkInfo::new(Some(NetworkSnapshot::wifi(local_ip, None))));
    let assistant = FieldAssistant::new(
        AgriConfig::load_or_default(),
        network,
        Arc::new(WatchLocation::default()),
    )?;

    println!("Scanning for sensor devices...");
    let devices = assistant.scan_devices().await?;

    for device in &devices {
        println!(
            "{:20} {:15} {}",
            device.display_name(),
            device.ip_address,
            device.signal_quality()
        );
    }

    if let Some(device) = devices.first() {
        let snapshot = assistant.connect_device(device).await?;
        println!(
            "\n{}: {:.1}°C, {:.1}%",
            device.display_name(),
            snapshot.reading.temperature,
            snapshot.reading.humidity
        );
    }

    Ok(())
}
