//! Configuration management.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thermald_sensors::{HostDevices, SearchPaths, Tools, DEFAULT_PORT, DEFAULT_TTL_SECS};

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Serve over HTTP instead of printing one snapshot
    #[serde(default)]
    pub daemon: bool,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Cache time-to-live in seconds
    #[serde(default = "default_cache")]
    pub cache: u64,

    /// HTTP path serving the snapshot
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Diagnostic tool executables
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Host paths scanned for sensors
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Diagnostic tool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// smartctl executable
    #[serde(default = "default_smartctl")]
    pub smartctl: String,

    /// nvme-cli executable
    #[serde(default = "default_nvme")]
    pub nvme: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            smartctl: default_smartctl(),
            nvme: default_nvme(),
        }
    }
}

/// Host path configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Thermal zone root
    #[serde(default = "default_thermal")]
    pub thermal: PathBuf,

    /// Device node root
    #[serde(default = "default_dev")]
    pub dev: PathBuf,

    /// Processor model source
    #[serde(default = "default_cpuinfo")]
    pub cpuinfo: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            thermal: default_thermal(),
            dev: default_dev(),
            cpuinfo: default_cpuinfo(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_cache() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_endpoint() -> String {
    "/".to_string()
}

fn default_smartctl() -> String {
    "smartctl".to_string()
}

fn default_nvme() -> String {
    "nvme".to_string()
}

fn default_thermal() -> PathBuf {
    PathBuf::from("/sys/class/thermal")
}

fn default_dev() -> PathBuf {
    PathBuf::from("/dev")
}

fn default_cpuinfo() -> PathBuf {
    PathBuf::from("/proc/cpuinfo")
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Endpoint with a guaranteed leading slash.
    pub fn endpoint_path(&self) -> String {
        let trimmed = self.endpoint.trim();
        if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }

    /// Rejects settings the server cannot start with.
    ///
    /// The endpoint is a literal path: route parameter and wildcard
    /// characters are not accepted.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint_path();
        if let Some(c) = endpoint
            .chars()
            .find(|c| matches!(c, ':' | '*' | '{' | '}') || c.is_whitespace())
        {
            bail!("Invalid endpoint {:?}: character {:?} is not allowed", endpoint, c);
        }
        Ok(())
    }

    /// Discovery roots.
    pub fn search_paths(&self) -> SearchPaths {
        SearchPaths {
            thermal: self.paths.thermal.clone(),
            dev: self.paths.dev.clone(),
        }
    }

    /// Reader for the local host.
    pub fn host_devices(&self) -> HostDevices {
        HostDevices::new(
            Tools {
                smartctl: self.tools.smartctl.clone(),
                nvme: self.tools.nvme.clone(),
            },
            self.paths.cpuinfo.clone(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon: false,
            port: default_port(),
            cache: default_cache(),
            endpoint: default_endpoint(),
            tools: ToolsConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.daemon);
        assert_eq!(config.port, 7634);
        assert_eq!(config.cache, 60);
        assert_eq!(config.endpoint_path(), "/");
        assert_eq!(config.search_paths(), SearchPaths::default());
        assert_eq!(config.host_devices().tools(), &Tools::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thermald.toml");
        std::fs::write(
            &path,
            r#"
daemon = true
cache = 15
endpoint = "temps"

[tools]
smartctl = "/usr/sbin/smartctl"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.daemon);
        assert_eq!(config.port, 7634);
        assert_eq!(config.cache, 15);
        assert_eq!(config.endpoint_path(), "/temps");
        assert_eq!(config.tools.smartctl, "/usr/sbin/smartctl");
        assert_eq!(config.tools.nvme, "nvme");
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn test_validate_endpoint() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.endpoint = "api/temps".to_string();
        assert!(config.validate().is_ok());

        for endpoint in ["/:id", "/temps/*rest", "/{id}", "/a b"] {
            config.endpoint = endpoint.to_string();
            assert!(config.validate().is_err(), "{} accepted", endpoint);
        }
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(dir.path().join("missing.toml")).is_err());

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
