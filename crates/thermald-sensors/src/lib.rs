//! thermald sensor library
//!
//! Discovers processor thermal zones, SATA/SAS disks and NVMe namespaces,
//! reads their temperatures through sysfs, `smartctl` and `nvme-cli`, and
//! keeps the latest readings in a time-to-live cache shared by HTTP handlers.

pub mod cache;
pub mod catalog;
pub mod device;
pub mod error;

pub use cache::{RefreshFailure, Snapshot, TemperatureCache};
pub use catalog::{Catalog, CatalogEntry, Exclusion, SearchPaths};
pub use device::{
    DeviceIdentity, DeviceReader, DeviceVariant, HostDevices, TemperatureRecord, Tools,
};
pub use error::{Error, ErrorKind, Result};

/// Default TCP port of the HTTP endpoint.
pub const DEFAULT_PORT: u16 = 7634;

/// Default cache time-to-live in seconds.
pub const DEFAULT_TTL_SECS: u64 = 60;
