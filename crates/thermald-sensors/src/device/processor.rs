//! Processor thermal zones under `/sys/class/thermal`.
//!
//! Each `thermal_zoneN/temp` file holds a single integer in millidegrees
//! Celsius (e.g. `54321` means 54.321 °C).

use super::UNKNOWN;
use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Reads a thermal-zone file and converts it to degrees Celsius.
pub(crate) fn read_temperature(path: &str) -> Result<f64> {
    let content = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_string(),
        source,
    })?;
    parse_millidegrees(path, &content)
}

/// Parses thermal-zone content.
pub(crate) fn parse_millidegrees(path: &str, content: &str) -> Result<f64> {
    let trimmed = content.trim();
    let milli: i64 = trimmed.parse().map_err(|_| Error::parse(path, trimmed))?;
    Ok(milli as f64 / 1000.0)
}

/// Returns the zone name (`thermal_zone0`) for a `.../thermal_zone0/temp` path.
pub(crate) fn zone_id(path: &str) -> String {
    Path::new(path)
        .parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Extracts the first `model name` entry from `/proc/cpuinfo` content.
pub(crate) fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("model name"))
        .find_map(|line| line.split_once(':'))
        .map(|(_, value)| value.trim().to_string())
        .filter(|model| !model.is_empty())
}

/// Reads the processor model, falling back to a placeholder.
pub(crate) fn cpu_model(cpuinfo_path: &Path) -> String {
    fs::read_to_string(cpuinfo_path)
        .ok()
        .and_then(|content| parse_cpu_model(&content))
        .unwrap_or_else(|| UNKNOWN.to_string())
}
