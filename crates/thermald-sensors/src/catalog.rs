//! Device discovery and initial record construction.

use crate::device::{DeviceReader, DeviceVariant, TemperatureRecord};
use crate::{Error, Result};
use futures::future::join_all;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Roots scanned for sensors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    /// Directory holding `thermal_zone*` entries.
    pub thermal: PathBuf,
    /// Directory holding `sd*` and `nvme*` device nodes.
    pub dev: PathBuf,
}

impl Default for SearchPaths {
    fn default() -> Self {
        Self {
            thermal: PathBuf::from("/sys/class/thermal"),
            dev: PathBuf::from("/dev"),
        }
    }
}

/// A discovered, not yet read, device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub variant: DeviceVariant,
    pub path: String,
}

/// Device left out of the record set, with the reason.
#[derive(Debug)]
pub struct Exclusion {
    pub variant: DeviceVariant,
    pub path: String,
    pub error: Error,
}

/// Outcome of building the initial record set.
#[derive(Debug)]
pub struct Catalog {
    /// Number of devices found on the host.
    pub discovered: usize,
    /// Devices with a valid initial reading, in catalog order.
    pub records: Vec<TemperatureRecord>,
    /// Devices whose identification or first reading failed or read zero.
    pub excluded: Vec<Exclusion>,
}

/// Enumerates sensors of every variant, in catalog order.
///
/// Fails with [`Error::Discovery`] only when nothing at all is found.
pub fn discover(paths: &SearchPaths) -> Result<Vec<CatalogEntry>> {
    let mut entries = Vec::new();
    for variant in DeviceVariant::ALL {
        let found = match variant {
            DeviceVariant::Processor => thermal_zones(&paths.thermal),
            DeviceVariant::SpinningDisk => device_nodes(&paths.dev, is_sata_disk),
            DeviceVariant::SolidStateNvme => device_nodes(&paths.dev, is_nvme_namespace),
        };
        if !found.is_empty() {
            info!("{}:", variant.to_string().to_uppercase());
        }
        for path in found {
            info!("  - {}", path);
            entries.push(CatalogEntry { variant, path });
        }
    }

    if entries.is_empty() {
        return Err(Error::Discovery);
    }
    Ok(entries)
}

/// Identifies and reads every entry concurrently, keeping catalog order.
///
/// A device whose identification or reading fails, or whose first reading
/// is exactly zero, is excluded rather than failing the whole build.
pub async fn build(entries: Vec<CatalogEntry>, reader: Arc<dyn DeviceReader>) -> Catalog {
    let discovered = entries.len();

    let tasks = entries.into_iter().map(|entry| {
        let reader = Arc::clone(&reader);
        async move {
            let CatalogEntry { variant, path } = entry;
            let task_path = path.clone();
            let outcome = tokio::task::spawn_blocking(move || -> Result<TemperatureRecord> {
                let identity = reader.identify(variant, &task_path)?;
                let temperature = reader.read(variant, &task_path)?;
                Ok(TemperatureRecord::new(variant, identity, task_path, temperature))
            })
            .await
            .unwrap_or_else(|e| Err(Error::aborted(&path, e)));
            (variant, path, outcome)
        }
    });

    let mut records = Vec::with_capacity(discovered);
    let mut excluded = Vec::new();
    for (variant, path, outcome) in join_all(tasks).await {
        match outcome {
            Ok(record) if record.temperature() != 0.0 => records.push(record),
            Ok(_) => excluded.push(Exclusion {
                variant,
                error: Error::not_found(&path, "non-zero temperature"),
                path,
            }),
            Err(error) => excluded.push(Exclusion {
                variant,
                path,
                error,
            }),
        }
    }

    for exclusion in &excluded {
        warn!("Error for {}: {}", exclusion.path, exclusion.error);
    }
    info!(
        "Found {} devices, {} valid devices",
        discovered,
        records.len()
    );

    Catalog {
        discovered,
        records,
        excluded,
    }
}

/// `<root>/thermal_zone*/temp`, sorted.
fn thermal_zones(root: &Path) -> Vec<String> {
    let Ok(dir) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut zones: Vec<String> = dir
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("thermal_zone"))
        .map(|entry| entry.path().join("temp"))
        .filter(|temp| temp.is_file())
        .map(|temp| temp.to_string_lossy().into_owned())
        .collect();
    zones.sort();
    zones
}

/// Device nodes in `root` whose name satisfies `accept`, sorted.
fn device_nodes(root: &Path, accept: fn(&str) -> bool) -> Vec<String> {
    let Ok(dir) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut nodes: Vec<String> = dir
        .flatten()
        .filter(|entry| accept(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path().to_string_lossy().into_owned())
        .collect();
    nodes.sort();
    nodes
}

/// `sd[a-z]`
fn is_sata_disk(name: &str) -> bool {
    matches!(name.as_bytes(), [b's', b'd', c] if c.is_ascii_lowercase())
}

/// `nvme[0-9]n[0-9]`
fn is_nvme_namespace(name: &str) -> bool {
    matches!(
        name.as_bytes(),
        [b'n', b'v', b'm', b'e', ctrl, b'n', ns] if ctrl.is_ascii_digit() && ns.is_ascii_digit()
    )
}
