// ABOUTME: Environment variable overrides for configuration.
// ABOUTME: Parses durations, booleans, and comma separated name lists.

use std::time::Duration;

pub const ENV_INTERVAL: &str = "LOOKOUT_INTERVAL";
pub const ENV_STOP_TIMEOUT: &str = "LOOKOUT_STOP_TIMEOUT";
pub const ENV_CLEANUP: &str = "LOOKOUT_CLEANUP";
pub const ENV_EXCLUDE: &str = "LOOKOUT_EXCLUDE";
pub const ENV_SOCKET: &str = "LOOKOUT_SOCKET";

/// Value of `name`, treating unset and blank alike.
pub(super) fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(super) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a human duration such as `30s`, `5m` or `1h 30m`.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value.trim()).map_err(|e| e.to_string())
}

pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got {other:?}")),
    }
}
