//! Device model and per-variant temperature readers.

mod disk;
mod host;
mod nvme;
mod processor;

pub use host::{HostDevices, Tools};

use crate::Result;
use serde::Serialize;
use std::fmt;

/// Placeholder used when identity metadata cannot be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Kind of temperature sensor, selecting the reader and path convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceVariant {
    /// Processor thermal zone exposed through sysfs.
    #[serde(rename = "cpu")]
    Processor,
    /// SATA/SAS disk queried through the diagnostics tool.
    #[serde(rename = "hdd")]
    SpinningDisk,
    /// NVMe namespace queried through the NVMe-admin tool.
    #[serde(rename = "nvme")]
    SolidStateNvme,
}

impl DeviceVariant {
    /// All variants, in catalog order.
    pub const ALL: [DeviceVariant; 3] = [
        DeviceVariant::Processor,
        DeviceVariant::SpinningDisk,
        DeviceVariant::SolidStateNvme,
    ];
}

impl fmt::Display for DeviceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceVariant::Processor => write!(f, "cpu"),
            DeviceVariant::SpinningDisk => write!(f, "hdd"),
            DeviceVariant::SolidStateNvme => write!(f, "nvme"),
        }
    }
}

/// Identity metadata resolved once at discovery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Stable identifier (zone name, disk serial, namespace path).
    pub id: String,
    /// Human-readable hardware model.
    pub model: String,
}

/// Latest temperature of one sensor.
///
/// Serializes to the wire shape consumers depend on:
/// `{"type", "id", "model"?, "temperature", "zone"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureRecord {
    #[serde(rename = "type")]
    variant: DeviceVariant,
    #[serde(rename = "id")]
    identifier: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    model: String,
    /// Degrees Celsius.
    pub(crate) temperature: f64,
    #[serde(rename = "zone")]
    source_path: String,
}

impl TemperatureRecord {
    /// Creates a record from resolved identity and an initial reading.
    pub fn new(
        variant: DeviceVariant,
        identity: DeviceIdentity,
        source_path: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            variant,
            identifier: identity.id,
            model: identity.model,
            temperature,
            source_path: source_path.into(),
        }
    }

    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Most recent reading in degrees Celsius.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Path handed back to the reader on every refresh.
    pub fn source_path(&self) -> &str {
        &self.source_path
    }
}

/// Backend capable of reading sensors of every variant.
///
/// Implementations must be free of shared mutable state: the cache calls
/// `read` from many blocking tasks at once and writes results back itself.
pub trait DeviceReader: Send + Sync {
    /// Reads the current temperature in degrees Celsius.
    fn read(&self, variant: DeviceVariant, path: &str) -> Result<f64>;

    /// Resolves identifier and model for a newly discovered device.
    fn identify(&self, variant: DeviceVariant, path: &str) -> Result<DeviceIdentity>;
}
