//! Configuration file support for Glate.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/glate/config.toml`.

use crate::catalog::{get_default_catalog, Catalog};
use crate::{Error, Result, SubstanceCategory, UnknownSubstancePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Longest accepted scan interval (one day)
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Substance data source
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON substance file; the built-in catalog is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Background monitor configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default)]
    pub alert: AlertConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            alert: AlertConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// When a dose sitting inside the alert band is reported
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertMode {
    /// Every scan that finds the dose in the band
    EveryTick,
    /// Only the scan on which the dose first enters the band
    Edge,
}

/// Clearance-window alert: fires while `lower_mg < remaining < upper_mg`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_alert_category")]
    pub category: SubstanceCategory,

    #[serde(default = "default_lower_mg")]
    pub lower_mg: f64,

    #[serde(default = "default_upper_mg")]
    pub upper_mg: f64,

    #[serde(default = "default_alert_mode")]
    pub mode: AlertMode,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            category: default_alert_category(),
            lower_mg: default_lower_mg(),
            upper_mg: default_upper_mg(),
            mode: default_alert_mode(),
        }
    }
}

impl AlertConfig {
    /// Strict on both ends
    pub fn in_band(&self, remaining_mg: f64) -> bool {
        remaining_mg > self.lower_mg && remaining_mg < self.upper_mg
    }
}

/// Unknown-substance handling per component
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_advisor_policy")]
    pub advisor: UnknownSubstancePolicy,

    #[serde(default = "default_monitor_policy")]
    pub monitor: UnknownSubstancePolicy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            advisor: default_advisor_policy(),
            monitor: default_monitor_policy(),
        }
    }
}

// Default value functions
fn default_interval_secs() -> u64 {
    10
}

fn default_alert_category() -> SubstanceCategory {
    SubstanceCategory::Stimulant
}

fn default_lower_mg() -> f64 {
    40.0
}

fn default_upper_mg() -> f64 {
    50.0
}

fn default_alert_mode() -> AlertMode {
    AlertMode::EveryTick
}

fn default_advisor_policy() -> UnknownSubstancePolicy {
    UnknownSubstancePolicy::Strict
}

fn default_monitor_policy() -> UnknownSubstancePolicy {
    UnknownSubstancePolicy::Lenient
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("glate").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject values the monitor cannot run with
    pub fn validate(&self) -> Result<()> {
        let secs = self.monitor.interval_secs;
        if secs == 0 || secs > MAX_INTERVAL_SECS {
            return Err(Error::Config(format!(
                "monitor.interval_secs must be between 1 and {}, got {}",
                MAX_INTERVAL_SECS, secs
            )));
        }
        let alert = &self.monitor.alert;
        if !(alert.lower_mg >= 0.0 && alert.lower_mg < alert.upper_mg) {
            return Err(Error::Config(format!(
                "monitor.alert band [{}, {}] is empty",
                alert.lower_mg, alert.upper_mg
            )));
        }
        Ok(())
    }

    /// The configured substance catalog, falling back to the built-in one
    pub fn load_catalog(&self) -> Result<Arc<Catalog>> {
        match &self.catalog.path {
            Some(path) => Catalog::load_from(path).map(Arc::new),
            None => Ok(get_default_catalog()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.monitor.interval_secs, 10);
        assert_eq!(config.monitor.alert.category, SubstanceCategory::Stimulant);
        assert_eq!(config.monitor.alert.mode, AlertMode::EveryTick);
        assert_eq!(config.policy.advisor, UnknownSubstancePolicy::Strict);
        assert_eq!(config.policy.monitor, UnknownSubstancePolicy::Lenient);
        assert!(config.catalog.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.monitor.alert.mode = AlertMode::Edge;
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.monitor.alert.mode, AlertMode::Edge);
        assert_eq!(parsed.monitor.interval_secs, config.monitor.interval_secs);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[monitor]
interval_secs = 30

[monitor.alert]
mode = "edge"

[policy]
advisor = "lenient"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.monitor.interval_secs, 30);
        assert_eq!(config.monitor.alert.mode, AlertMode::Edge);
        assert_eq!(config.monitor.alert.upper_mg, 50.0); // default
        assert_eq!(config.policy.advisor, UnknownSubstancePolicy::Lenient);
        assert_eq!(config.policy.monitor, UnknownSubstancePolicy::Lenient);
    }

    #[test]
    fn test_band_is_exclusive() {
        let alert = AlertConfig::default();
        assert!(!alert.in_band(40.0));
        assert!(alert.in_band(40.01));
        assert!(alert.in_band(49.99));
        assert!(!alert.in_band(50.0));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.monitor.interval_secs = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.monitor.interval_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.monitor.interval_secs = MAX_INTERVAL_SECS;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.monitor.alert.lower_mg = 60.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_catalog_defaults_to_builtin() {
        let catalog = Config::default().load_catalog().unwrap();
        assert!(catalog.substances.contains_key("caffeine"));
    }
}
