use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use hccapx_logging::LoggingConfig;

use crate::engine::CaptureOptions;
use crate::error::{HccapxError, Result};
use crate::frames::MacAddress;

pub const DEFAULT_ROOT_PATH: &str = ".";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const OVERRIDE_FILENAME: &str = "capture.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub root_path: PathBuf,
    pub anonce_from_m3: bool,
    /// Only feed frames from this BSSID; first EAPOL BSSID wins when unset
    pub bssid: Option<MacAddress>,
    pub logging: LoggingConfig,
    /// Settings that were ignored while loading; see [`CaptureConfig::log_warnings`]
    pub warnings: Vec<String>,
}

/// Optional `<root>/config/capture.json`; every field may be omitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CaptureOverride {
    pub anonce_from_m3: Option<bool>,
    pub bssid: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<bool>,
}

impl CaptureConfig {
    pub fn from_env() -> Self {
        let root_path = env::var("HCCAPX_ROOT")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_PATH));
        Self::load(root_path)
    }

    /// Environment settings plus `<root_path>/config/capture.json`
    pub fn load(root_path: PathBuf) -> Self {
        let anonce_from_m3 = env_bool("HCCAPX_ANONCE_FROM_M3", false);
        let mut warnings = Vec::new();
        let bssid = env::var("HCCAPX_BSSID").ok().and_then(|v| match v.parse() {
            Ok(mac) => Some(mac),
            Err(err) => {
                warnings.push(format!("Ignoring HCCAPX_BSSID: {}", err));
                None
            }
        });
        let logging = LoggingConfig {
            enabled: !env_bool("HCCAPX_LOGS_DISABLED", false),
            level: env::var("HCCAPX_LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            file_logging: env_bool("HCCAPX_LOG_FILE", false),
        };

        let mut cfg = Self {
            root_path,
            anonce_from_m3,
            bssid,
            logging,
            warnings,
        };

        match load_override(&cfg.root_path) {
            Ok(Some(over)) => {
                if let Err(err) = cfg.apply_override(over) {
                    cfg.warnings
                        .push(format!("Ignoring {}: {}", OVERRIDE_FILENAME, err));
                }
            }
            Ok(None) => {}
            Err(err) => cfg
                .warnings
                .push(format!("Ignoring {}: {}", OVERRIDE_FILENAME, err)),
        }

        cfg
    }

    /// Merge a file override; all-or-nothing
    pub fn apply_override(&mut self, over: CaptureOverride) -> Result<()> {
        let bssid = match over.bssid {
            Some(text) => Some(
                text.parse::<MacAddress>()
                    .map_err(|e| HccapxError::Config(format!("bssid: {}", e)))?,
            ),
            None => self.bssid,
        };

        self.bssid = bssid;
        if let Some(flag) = over.anonce_from_m3 {
            self.anonce_from_m3 = flag;
        }
        if let Some(level) = over.log_level {
            self.logging.level = level;
        }
        if let Some(flag) = over.log_file {
            self.logging.file_logging = flag;
        }
        Ok(())
    }

    pub fn options(&self) -> CaptureOptions {
        CaptureOptions {
            anonce_from_m3: self.anonce_from_m3,
        }
    }

    /// Emit load-time warnings; call once the subscriber is installed
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root_path.join("logs")
    }
}

pub fn override_path(root: &Path) -> PathBuf {
    root.join("config").join(OVERRIDE_FILENAME)
}

fn load_override(root: &Path) -> Result<Option<CaptureOverride>> {
    let path = override_path(root);
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| HccapxError::Config(format!("{}: {}", path.display(), e)))
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(default)
}
