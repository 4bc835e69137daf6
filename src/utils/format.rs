//! Human-readable formatting helpers.

use indicatif::HumanBytes;
use std::time::Duration;

/// Format a byte count with binary units, e.g. `1.50 GiB`.
pub fn human_size(bytes: u64) -> String {
    HumanBytes(bytes).to_string()
}

/// Format an optional size, `unknown` when absent.
pub fn human_size_opt(bytes: Option<u64>) -> String {
    bytes.map(human_size).unwrap_or_else(|| "unknown".to_string())
}

/// Format a duration as `[hh:]mm:ss`.
pub fn hhmmss(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
