use chrono::{DateTime, Local, TimeZone};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Render a byte count with the largest fitting binary unit, two decimals,
/// trailing zeros trimmed: `2_400_000` → `"2.29 MB"`, `1024` → `"1 KB"`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, UNITS[unit])
}

/// Render a millisecond timestamp in the local time zone.
pub fn format_date(timestamp_ms: i64) -> String {
    format_date_in(timestamp_ms, &Local)
}

pub fn format_date_in<Tz: TimeZone>(timestamp_ms: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(utc) => utc
            .with_timezone(tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "Invalid Date".to_string(),
    }
}

/// Subtype half of a MIME type, `"Unknown"` when there is none.
pub fn format_file_type(mime_type: &str) -> &str {
    match mime_type.split('/').nth(1) {
        Some(subtype) if !subtype.is_empty() => subtype,
        _ => "Unknown",
    }
}
