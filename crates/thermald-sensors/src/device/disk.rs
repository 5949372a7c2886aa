//! SATA/SAS disks through `smartctl`.

use super::{DeviceIdentity, UNKNOWN};
use crate::{Error, Result};

/// Attribute markers in priority order, with the whitespace field holding
/// the value on a matching line.
///
/// ATA attribute rows carry the raw value in column 9:
/// `ID# ATTRIBUTE_NAME FLAG VALUE WORST THRESH TYPE UPDATED WHEN_FAILED RAW_VALUE`.
/// SCSI rows look like `Current Drive Temperature:     34 C`.
const TEMPERATURE_MARKERS: [(&str, usize); 5] = [
    ("194 Temp", 9),
    ("190 Airflow", 9),
    ("Temperature Sensor 1", 9),
    ("Current Drive Temperature", 3),
    ("Temperature", 3),
];

/// Extracts the drive temperature from `smartctl -a` output.
///
/// The first line containing any marker decides the result; later lines are
/// never consulted even if that line is malformed.
pub(crate) fn parse_attributes(path: &str, output: &str) -> Result<f64> {
    for line in output.lines() {
        let Some((_, field)) = TEMPERATURE_MARKERS
            .iter()
            .find(|(marker, _)| line.contains(marker))
        else {
            continue;
        };

        let value = line
            .split_whitespace()
            .nth(*field)
            .ok_or_else(|| Error::parse(path, line.trim()))?;
        return value
            .parse::<f64>()
            .ok()
            .filter(|temp| temp.is_finite())
            .ok_or_else(|| Error::parse(path, value));
    }

    Err(Error::not_found(path, "temperature attribute"))
}

/// Extracts serial number and model from `smartctl -i` output.
pub(crate) fn parse_identity(output: &str) -> DeviceIdentity {
    let mut serial = None;
    let mut model = None;

    for line in output.lines() {
        if line.contains("Serial Number") {
            serial = label_value(line);
        }
        if line.contains("Device Model") {
            model = label_value(line);
        }
        if serial.is_some() && model.is_some() {
            break;
        }
    }

    DeviceIdentity {
        id: serial.unwrap_or_else(|| UNKNOWN.to_string()),
        model: model.unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

fn label_value(line: &str) -> Option<String> {
    line.split_once(':')
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
