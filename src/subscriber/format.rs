//! Bandwidth formatting helpers
//!
//! Operators type limits as `download/upload` in Mbps ("10/10"); the router
//! stores `max-limit` in bits per second ("10000000/10000000").

/// Shown when a subscriber has no queue
pub const NO_LIMIT: &str = "none";

/// Convert an operator limit ("10/10") to the device encoding
///
/// Each purely numeric side gets six zeros appended. A side that already
/// carries device units (e.g. "512k") is passed through. Input that is not a
/// two-sided pair is returned unchanged.
pub fn to_device_rate(limit: &str) -> String {
    match split_pair(limit) {
        Some((down, up)) => format!("{}/{}", scale_mbps(down), scale_mbps(up)),
        None => limit.to_string(),
    }
}

/// Render a device `max-limit` ("5000000/5000000") as "5 Mbps / 5 Mbps"
pub fn format_rate(limit: &str) -> String {
    if limit.is_empty() {
        return NO_LIMIT.to_string();
    }
    match split_pair(limit) {
        Some((down, up)) => format!("{} / {}", humanize(down), humanize(up)),
        None => limit.to_string(),
    }
}

fn split_pair(limit: &str) -> Option<(&str, &str)> {
    let mut parts = limit.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(down), Some(up), None) => Some((down, up)),
        _ => None,
    }
}

fn scale_mbps(side: &str) -> String {
    if !side.is_empty() && side.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}000000", side)
    } else {
        side.to_string()
    }
}

fn humanize(side: &str) -> String {
    match side.parse::<i64>() {
        Ok(bps) if bps >= 1_000_000 => format!("{} Mbps", bps / 1_000_000),
        Ok(bps) if bps >= 1_000 => format!("{} Kbps", bps / 1_000),
        Ok(bps) => format!("{} bps", bps),
        Err(_) => "N/A".to_string(),
    }
}
