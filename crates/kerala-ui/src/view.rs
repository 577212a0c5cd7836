//! Plain-text rendering of the weather screen.

use std::fmt::Write;

use kerala_weather::{DistrictRegistry, StoredReading};

use crate::models::weather_model::LatestWeather;

const NOT_AVAILABLE: &str = "N/A";
const HISTORY_HEADERS: [&str; 6] = [
    "District",
    "Temperature (°C)",
    "Wind Speed (km/h)",
    "Humidity (%)",
    "Rain (mm)",
    "Timestamp",
];

/// The latest-update panel; every value reads `N/A` before the first reading.
pub fn render_latest(latest: Option<&LatestWeather>) -> String {
    let Some(latest) = latest else {
        return [
            "Latest Weather Update".to_string(),
            format!("Temperature: {NOT_AVAILABLE}"),
            format!("Wind Speed: {NOT_AVAILABLE}"),
            format!("Humidity: {NOT_AVAILABLE}"),
            format!("Rain: {NOT_AVAILABLE}"),
        ]
        .join("\n");
    };

    let r = &latest.reading;
    [
        format!("Latest Weather Update for {}", r.district),
        format!("Temperature: {:.2} °C", r.temperature),
        format!("Wind Speed: {:.2} km/h", r.wind_speed),
        format!("Humidity: {:.2} %", r.humidity),
        format!("Rain: {:.2} mm", r.rain),
    ]
    .join("\n")
}

/// History table, newest first, at most `limit` rows (0 for all).
pub fn render_history(rows: &[StoredReading], limit: usize) -> String {
    let limit = if limit == 0 { rows.len() } else { limit };
    let cells: Vec<[String; 6]> = rows
        .iter()
        .take(limit)
        .map(|row| {
            let r = &row.reading;
            [
                r.district.clone(),
                format!("{:.2}", r.temperature),
                format!("{:.2}", r.wind_speed),
                format!("{:.2}", r.humidity),
                format!("{:.2}", r.rain),
                row.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]
        })
        .collect();

    let mut widths = HISTORY_HEADERS.map(|h| h.chars().count());
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, HISTORY_HEADERS.iter().copied(), &widths);
    for line in &cells {
        push_row(&mut out, line.iter().map(String::as_str), &widths);
    }

    if rows.is_empty() {
        out.push_str("(no stored readings)\n");
    } else if rows.len() > limit {
        let _ = writeln!(out, "... {} older readings not shown", rows.len() - limit);
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

pub fn render_districts(registry: &DistrictRegistry) -> String {
    let mut out = String::new();
    for district in registry.iter() {
        let _ = writeln!(
            out,
            "{:<20} {:>8.4} {:>8.4}",
            district.name, district.latitude, district.longitude
        );
    }
    out
}
