//! Response normalizer - turns a transport outcome into an [`ApiResponse`]

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::models::ApiResponse;
use crate::network::{RawResponse, TransportOutcome};

/// Status used when no HTTP response was obtained
pub const FAILURE_STATUS: u16 = 0;

/// Status text paired with [`FAILURE_STATUS`]
pub const FAILURE_STATUS_TEXT: &str = "Error";

/// Elapsed time rounded to whole milliseconds
pub fn elapsed_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}

/// Build the uniform response record for a success or a failure
pub fn normalize(outcome: TransportOutcome, elapsed: Duration) -> ApiResponse {
    match outcome {
        Ok(raw) => success_response(raw, elapsed),
        Err(e) => failure_response(&e.message, elapsed),
    }
}

fn success_response(raw: RawResponse, elapsed: Duration) -> ApiResponse {
    // Repeated headers fold into one comma-separated value
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in raw.headers {
        match headers.entry(name.to_ascii_lowercase()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.push_str(", ");
                existing.push_str(&value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
        }
    }

    let body = String::from_utf8_lossy(&raw.body).into_owned();
    ApiResponse {
        status: raw.status,
        status_text: raw.status_text,
        headers,
        size: body.len(),
        body,
        time: elapsed_millis(elapsed),
    }
}

/// Synthetic response for a send that produced no HTTP response
pub fn failure_response(message: &str, elapsed: Duration) -> ApiResponse {
    let body = serde_json::to_string_pretty(&serde_json::json!({ "error": message }))
        .unwrap_or_else(|_| format!("{{\"error\": {:?}}}", message));
    ApiResponse {
        status: FAILURE_STATUS,
        status_text: FAILURE_STATUS_TEXT.to_string(),
        headers: BTreeMap::new(),
        body,
        time: elapsed_millis(elapsed),
        size: 0,
    }
}

/// Human-readable size: "0 B", "512 B", "1.5 KB", "2 MB"
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["B", "KB", "MB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 10.0).round() / 10.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Human-readable duration: "250 ms", "1.50 s"
pub fn format_time(ms: u64) -> String {
    if ms < 1000 {
        format!("{} ms", ms)
    } else {
        format!("{:.2} s", ms as f64 / 1000.0)
    }
}
