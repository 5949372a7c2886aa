//! Reader backed by the real host: sysfs files and diagnostic tools.

use super::{disk, nvme, processor, DeviceIdentity, DeviceReader, DeviceVariant};
use crate::{Error, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// External diagnostic executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    /// Disk self-monitoring tool (`smartctl`).
    pub smartctl: String,
    /// NVMe admin tool (`nvme`).
    pub nvme: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            smartctl: "smartctl".to_string(),
            nvme: "nvme".to_string(),
        }
    }
}

/// [`DeviceReader`] for the local machine.
#[derive(Debug, Clone)]
pub struct HostDevices {
    tools: Tools,
    cpuinfo: PathBuf,
}

impl HostDevices {
    /// Creates a host reader using the given tools and cpuinfo source.
    pub fn new(tools: Tools, cpuinfo: impl Into<PathBuf>) -> Self {
        Self {
            tools,
            cpuinfo: cpuinfo.into(),
        }
    }

    pub fn tools(&self) -> &Tools {
        &self.tools
    }

    /// Runs `tool args...` and returns stdout; a spawn failure or non-zero
    /// exit is reported against `path`.
    fn run(&self, tool: &str, args: &[&str], path: &str) -> Result<String> {
        debug!("Running {} {}", tool, args.join(" "));
        let output = Command::new(tool)
            .args(args)
            .output()
            .map_err(|e| Error::Command {
                tool: tool.to_string(),
                path: path.to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.lines().next().map(str::trim) {
                Some(first) if !first.is_empty() => format!("{}: {}", output.status, first),
                _ => output.status.to_string(),
            };
            return Err(Error::Command {
                tool: tool.to_string(),
                path: path.to_string(),
                detail,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for HostDevices {
    fn default() -> Self {
        Self::new(Tools::default(), "/proc/cpuinfo")
    }
}

impl DeviceReader for HostDevices {
    fn read(&self, variant: DeviceVariant, path: &str) -> Result<f64> {
        match variant {
            DeviceVariant::Processor => processor::read_temperature(path),
            DeviceVariant::SpinningDisk => {
                let output = self.run(&self.tools.smartctl, &["-a", path], path)?;
                disk::parse_attributes(path, &output)
            }
            DeviceVariant::SolidStateNvme => {
                let output = self.run(&self.tools.nvme, &["smart-log", path], path)?;
                nvme::parse_smart_log(path, &output)
            }
        }
    }

    fn identify(&self, variant: DeviceVariant, path: &str) -> Result<DeviceIdentity> {
        match variant {
            DeviceVariant::Processor => Ok(DeviceIdentity {
                id: processor::zone_id(path),
                model: processor::cpu_model(&self.cpuinfo),
            }),
            DeviceVariant::SpinningDisk => {
                let output = self.run(&self.tools.smartctl, &["-i", path], path)?;
                Ok(disk::parse_identity(&output))
            }
            DeviceVariant::SolidStateNvme => {
                let output = self.run(&self.tools.nvme, &["list"], path)?;
                let model = nvme::parse_list_model(path, &output)
                    .ok_or_else(|| Error::not_found(path, "nvme list entry"))?;
                Ok(DeviceIdentity {
                    id: path.to_string(),
                    model,
                })
            }
        }
    }
}
