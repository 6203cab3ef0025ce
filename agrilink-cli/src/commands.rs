use agrilink::{
    AgriConfig, AnalysisDraft, CapturedImage, Coordinates, DeviceDescriptor, FieldAssistant,
    NetworkSnapshot, WatchLocation, WatchNetworkInfo,
};
use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::sync::Arc;

use crate::render;
use crate::{Command, LocationArgs, NetworkArgs};

pub async fn dispatch(config: AgriConfig, command: Command) -> Result<()> {
    match command {
        Command::Scan { network } => scan(config, network).await,
        Command::Connect { device, location } => connect(config, &device, location).await,
        Command::Submit {
            image,
            soil,
            stage,
            new_model,
            device,
            temperature,
            humidity,
            location,
            json,
        } => {
            let image = CapturedImage::from_path(&image)
                .await
                .with_context(|| format!("could not read {}", image.display()))?;
            let mut draft = AnalysisDraft {
                image: Some(image),
                soil_type: Some(soil),
                growth_stage: Some(stage),
                use_new_model: new_model,
                temperature,
                humidity,
                location: coordinates(&location),
            };
            submit(config, &mut draft, device.as_deref(), location, json).await
        }
        Command::Weather { watch } => weather(config, watch).await,
    }
}

fn coordinates(location: &LocationArgs) -> Option<Coordinates> {
    match (location.lat, location.lon) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    }
}

/// Builds an assistant for commands that do not scan.
fn offline_assistant(config: AgriConfig, location: &LocationArgs) -> Result<FieldAssistant> {
    let network = Arc::new(WatchNetworkInfo::default());
    let location = Arc::new(WatchLocation::new(coordinates(location)));
    Ok(FieldAssistant::new(config, network, location)?)
}

async fn scan(config: AgriConfig, args: NetworkArgs) -> Result<()> {
    let snapshot = if args.not_wifi {
        NetworkSnapshot::other(Some(args.ip))
    } else {
        NetworkSnapshot::wifi(args.ip, args.ssid)
    };
    let network = Arc::new(WatchNetworkInfo::new(Some(snapshot)));
    let assistant = FieldAssistant::new(config, network, Arc::new(WatchLocation::default()))?;

    let devices = assistant.scan_devices().await?;
    if devices.is_empty() {
        println!("No devices found. Make sure the sensor is powered and on the same Wi-Fi.");
        return Ok(());
    }

    print!("{}", render::device_table(&devices));
    Ok(())
}

/// A device given on the command line carries only its address.
fn device_at(address: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        hostname: None,
        ip_address: address.to_string(),
        device_type: String::new(),
        signal_strength: None,
        mac_address: None,
    }
}

async fn connect(config: AgriConfig, address: &str, location: LocationArgs) -> Result<()> {
    let assistant = offline_assistant(config, &location)?;
    let snapshot = assistant.connect_device(&device_at(address)).await?;
    println!("{}", render::sensor_snapshot(&snapshot));
    Ok(())
}

async fn submit(
    config: AgriConfig,
    draft: &mut AnalysisDraft,
    device: Option<&str>,
    location: LocationArgs,
    json: bool,
) -> Result<()> {
    let assistant = offline_assistant(config, &location)?;

    if let Some(address) = device {
        let snapshot = assistant.connect_device(&device_at(address)).await?;
        info!("Using {}", render::sensor_snapshot(&snapshot));
        assistant.fill_draft(draft);
    }

    let missing = draft.missing_fields();
    if !missing.is_empty() {
        for failure in &missing {
            warn!("{failure}");
        }
        bail!("{} required input(s) missing", missing.len());
    }

    info!("Uploading to {}", assistant.config().analysis_base_url);
    let result = assistant.submit_analysis(draft).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render::analysis_result(&result));
    }
    Ok(())
}

async fn weather(config: AgriConfig, watch: bool) -> Result<()> {
    let assistant = offline_assistant(config, &LocationArgs::default())?;

    if !watch {
        let report = assistant.fetch_weather().await?;
        println!("{}", render::weather(&report));
        return Ok(());
    }

    let mut rx = assistant.watch_weather();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    bail!("weather refresh stopped");
                }
                if let Some(report) = rx.borrow_and_update().as_ref() {
                    println!("{}", render::weather(report));
                }
            }
        }
    }
    Ok(())
}
