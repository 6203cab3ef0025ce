//! Plain-text rendering of scan results, readings and reports.

use agrilink::{AnalysisResult, DeviceDescriptor, SensorSnapshot, WeatherIcon, WeatherReport};
use std::fmt::Write;

pub fn device_table(devices: &[DeviceDescriptor]) -> String {
    let name_width = devices
        .iter()
        .map(|d| d.display_name().len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<name_width$}  {:<15}  {:<12}  SIGNAL",
        "NAME", "ADDRESS", "TYPE"
    );
    for device in devices {
        let signal = match device.signal_strength {
            Some(rssi) => format!("{} ({rssi} dBm)", device.signal_quality()),
            None => device.signal_quality().to_string(),
        };
        let _ = writeln!(
            out,
            "{:<name_width$}  {:<15}  {:<12}  {signal}",
            device.display_name(),
            device.ip_address,
            device.device_type,
        );
    }
    out
}

pub fn sensor_snapshot(snapshot: &SensorSnapshot) -> String {
    let mut line = format!(
        "{:.1}°C, {:.1}% humidity",
        snapshot.reading.temperature, snapshot.reading.humidity
    );
    if let Some(loc) = snapshot.location {
        let _ = write!(line, " at {:.4}, {:.4}", loc.latitude, loc.longitude);
    }
    line
}

pub fn analysis_result(result: &AnalysisResult) -> String {
    let report = &result.report;
    let mut out = String::new();

    let weed = report.weed_name.as_deref().unwrap_or("Unknown");
    match report.confidence {
        Some(c) => {
            let _ = writeln!(out, "Weed:        {weed} ({c:.1}% confidence)");
        }
        None => {
            let _ = writeln!(out, "Weed:        {weed}");
        }
    }
    if let Some(herbicide) = &report.predicted_herbicide_name {
        let _ = writeln!(out, "Herbicide:   {herbicide}");
    }
    if let Some(rate) = report.application_rate() {
        let _ = writeln!(out, "Rate:        {rate}");
    }

    for option in &report.herbicide_options {
        let mut notes = Vec::new();
        if option.is_safe_for_tomato() {
            notes.push("safe for tomato");
        }
        if option.has_reported_resistance() {
            notes.push("resistance reported");
        }
        let _ = write!(out, "  - {}", option.name);
        if let Some(rate) = &option.application_rate {
            let _ = write!(out, ", {rate}");
        }
        if !notes.is_empty() {
            let _ = write!(out, " [{}]", notes.join(", "));
        }
        out.push('\n');
    }

    let detections = result.confident_detections();
    if !detections.is_empty() {
        let _ = writeln!(out, "Detections:");
        for d in detections {
            let _ = writeln!(out, "  - {} {:.0}%", d.class_name, d.confidence * 100.0);
        }
    }

    let _ = writeln!(out, "Image:       {}", result.captured_image_uri);
    out
}

pub fn weather(report: &WeatherReport) -> String {
    let icon = match report.icon() {
        WeatherIcon::Sunny => "☀",
        WeatherIcon::Rainy => "☂",
        WeatherIcon::Cloudy => "☁",
        WeatherIcon::Other => "·",
    };
    let mut line = format!(
        "{icon} {} {:.1}°C, {:.0}% humidity, {}",
        report.location, report.temperature_c, report.humidity, report.condition
    );
    if let Some(advisory) = &report.advisory {
        let _ = write!(line, "\n  ! {advisory}");
    }
    line
}
