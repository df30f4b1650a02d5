//! Runtime configuration.
//!
//! Values come from a YAML file, then from command line flags or their
//! `LITIME_MONITOR_*` environment variables. Each collaborator receives its own
//! section at construction time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use bluest::Uuid;
use log::debug;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub influxdb: InfluxDbConfig,
    pub poll: PollConfig,
}

/// Which controller to connect to and where its telemetry lives
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// MAC address of the controller
    pub address: String,
    /// Advertised name, takes precedence over `address` when set
    pub name: Option<String>,
    /// GATT service carrying the serial characteristic
    pub service: String,
    /// Characteristic used both to write polls and to receive notifications
    pub characteristic: String,
    /// How long to scan before giving up
    pub scan_timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: "00:00:00:00:00:00".to_string(),
            name: None,
            service: "0000ffe0-0000-1000-8000-00805f9b34fb".to_string(),
            characteristic: "0000ffe1-0000-1000-8000-00805f9b34fb".to_string(),
            scan_timeout_secs: 30,
        }
    }
}

impl DeviceConfig {
    pub fn service_id(&self) -> anyhow::Result<Uuid> {
        Uuid::parse_str(&self.service)
            .with_context(|| format!("invalid service UUID {:?}", self.service))
    }

    pub fn characteristic_id(&self) -> anyhow::Result<Uuid> {
        Uuid::parse_str(&self.characteristic)
            .with_context(|| format!("invalid characteristic UUID {:?}", self.characteristic))
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InfluxDbConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub measurement: String,
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8086".to_string(),
            token: "my-token".to_string(),
            org: "my-org".to_string(),
            bucket: "solar_charge_controller".to_string(),
            measurement: "solar_charge_controller".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// A configuration together with the file it was read from, if any
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: Option<PathBuf>,
}

impl Config {
    pub const ENV_CONFIG_PATH: &'static str = "LITIME_MONITOR_CONFIG";

    /// The places searched for `config.yaml`, most specific first.
    pub fn default_candidates() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from("/etc/litime-monitor/config.yaml")];
        if let Ok(home) = std::env::var("HOME") {
            candidates.push(Path::new(&home).join(".litime-monitor").join("config.yaml"));
        }
        candidates.push(PathBuf::from("config.yaml"));
        candidates
    }

    /// Load the configuration.
    ///
    /// An explicit path, or one named by `LITIME_MONITOR_CONFIG`, must exist.
    /// Otherwise the first existing candidate is used and defaults apply when
    /// there is none.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<LoadedConfig> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                return Self::from_path(Path::new(&env_path));
            }
        }
        Self::load_from_candidates(&Self::default_candidates())
    }

    pub fn load_from_candidates<P: AsRef<Path>>(candidates: &[P]) -> anyhow::Result<LoadedConfig> {
        for candidate in candidates {
            if candidate.as_ref().exists() {
                return Self::from_path(candidate.as_ref());
            }
        }
        debug!("no configuration file found, using defaults");
        Ok(LoadedConfig { config: Config::default(), source: None })
    }

    fn from_path(path: &Path) -> anyhow::Result<LoadedConfig> {
        debug!("loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(LoadedConfig { config, source: Some(path.to_path_buf()) })
    }

    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        // An empty document deserializes to unit, not to a map
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll.interval_secs == 0 {
            return Err(anyhow!("poll.interval_secs must be greater than zero"));
        }
        if self.device.scan_timeout_secs == 0 {
            return Err(anyhow!("device.scan_timeout_secs must be greater than zero"));
        }
        self.device.service_id()?;
        self.device.characteristic_id()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.device.address, "00:00:00:00:00:00");
        assert_eq!(config.influxdb.url, "http://127.0.0.1:8086");
        assert_eq!(config.influxdb.bucket, "solar_charge_controller");
        assert_eq!(config.poll.interval(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "device:\n  address: \"C8:47:80:12:34:56\"\ninfluxdb:\n  token: secret\n",
        )
        .unwrap();
        assert_eq!(config.device.address, "C8:47:80:12:34:56");
        assert_eq!(config.device.service, DeviceConfig::default().service);
        assert_eq!(config.influxdb.token, "secret");
        assert_eq!(config.influxdb.org, "my-org");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        assert!(Config::from_yaml("poll: [not, a, map]").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.poll.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_uuid() {
        let mut config = Config::default();
        config.device.characteristic = "ffe1".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let present = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&present).unwrap();
        writeln!(file, "poll:\n  interval_secs: 3").unwrap();

        let loaded = Config::load_from_candidates(&[missing, present.clone()]).unwrap();
        assert_eq!(loaded.source, Some(present));
        assert_eq!(loaded.config.poll.interval_secs, 3);
    }

    #[test]
    fn test_no_candidate_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from_candidates(&[dir.path().join("nope.yaml")]).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config, Config::default());
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(dir.path().join("nope.yaml").as_path())).is_err());
    }
}
