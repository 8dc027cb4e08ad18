use crate::error::{CadenceError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// FacilityConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FacilityConfig {
    Lco(LcoSettings),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LcoSettings {
    #[serde(default = "default_portal_url")]
    pub portal_url: String,
    /// JSON file holding `lco_token`. A leading `~/` is expanded.
    pub credentials_file: PathBuf,
    /// Per-request HTTP timeout.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_portal_url() -> String {
    "https://observe.lco.global".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upper bound on one facility submission; the cycle fails past it.
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_secs: u64,
    /// How long a cadence lease stays valid if its holder never releases it.
    #[serde(default = "default_lease_ttl")]
    pub lease_ttl_secs: u64,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    #[serde(default)]
    pub facilities: BTreeMap<String, FacilityConfig>,
}

fn default_submit_timeout() -> u64 {
    60
}

fn default_lease_ttl() -> u64 {
    300
}

fn default_tick_interval() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        let mut facilities = BTreeMap::new();
        facilities.insert(
            "LCO".to_string(),
            FacilityConfig::Lco(LcoSettings {
                portal_url: default_portal_url(),
                credentials_file: PathBuf::from("~/.lco/credentials.json"),
                http_timeout_secs: default_http_timeout(),
            }),
        );
        Self {
            submit_timeout_secs: default_submit_timeout(),
            lease_ttl_secs: default_lease_ttl(),
            tick_interval_secs: default_tick_interval(),
            facilities,
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(CadenceError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (field, value) in [
            ("submit_timeout_secs", self.submit_timeout_secs),
            ("lease_ttl_secs", self.lease_ttl_secs),
            ("tick_interval_secs", self.tick_interval_secs),
        ] {
            if value == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{field} must be greater than zero"),
                });
            }
        }

        // A lease that can expire mid-submission lets a second run in.
        if self.lease_ttl_secs > 0 && self.lease_ttl_secs <= self.submit_timeout_secs {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "lease_ttl_secs ({}) should exceed submit_timeout_secs ({})",
                    self.lease_ttl_secs, self.submit_timeout_secs
                ),
            });
        }

        if self.facilities.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no facilities configured; renewals cannot be submitted".to_string(),
            });
        }

        for (name, facility) in &self.facilities {
            match facility {
                FacilityConfig::Lco(lco) => {
                    if lco.portal_url.trim().is_empty() {
                        warnings.push(ConfigWarning {
                            level: WarnLevel::Error,
                            message: format!("facility '{name}' has an empty portal_url"),
                        });
                    }
                    let creds = paths::expand_home(&lco.credentials_file)
                        .unwrap_or_else(|_| lco.credentials_file.clone());
                    if !creds.exists() {
                        warnings.push(ConfigWarning {
                            level: WarnLevel::Warning,
                            message: format!(
                                "facility '{name}': credentials file {} not found",
                                creds.display()
                            ),
                        });
                    }
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
