use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{PuttrackError, zones::ZoneRoles};

const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_DETECTION_TIMEOUT_S: f64 = 3.0;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// An attempt in progress resolves as a TIMEOUT miss once the ball has not
    /// been detected for longer than this
    pub detection_timeout_s: f64,
    /// Enforced by the session runner, not the classifier
    pub session_time_limit_s: Option<f64>,
    pub zone_roles: ZoneRoles,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            detection_timeout_s: DEFAULT_DETECTION_TIMEOUT_S,
            session_time_limit_s: None,
            zone_roles: ZoneRoles::default(),
        }
    }
}

impl TrackerConfig {
    fn config_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("puttrack").join(CONFIG_FILE_NAME))
    }

    /// Reads the user's config file. A missing or unreadable file yields `None`.
    pub fn from_local_file() -> Option<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            return None;
        }
        let file = std::fs::File::open(&config_path)
            .map_err(|e| warn!("Could not open config file {:?}: {}", config_path, e))
            .ok()?;
        serde_json::from_reader(file)
            .map_err(|e| warn!("Could not parse config file {:?}: {}", config_path, e))
            .ok()
    }

    pub fn save(&self) -> Result<(), PuttrackError> {
        let config_path = Self::config_path().ok_or(PuttrackError::NoConfigDir)?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PuttrackError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PuttrackError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PuttrackError::ConfigSerializeError { source: e })
    }

    /// Rejects values the classifier and runner cannot work with.
    pub fn validate(&self) -> Result<(), PuttrackError> {
        if !self.detection_timeout_s.is_finite() || self.detection_timeout_s <= 0. {
            return Err(PuttrackError::InvalidUserInput {
                field: "detection_timeout_s".to_string(),
                reason: format!("must be a positive number, got {}", self.detection_timeout_s),
            });
        }
        if let Some(limit) = self.session_time_limit_s {
            if !limit.is_finite() || limit <= 0. {
                return Err(PuttrackError::InvalidUserInput {
                    field: "session_time_limit_s".to_string(),
                    reason: format!("must be a positive number, got {}", limit),
                });
            }
        }
        Ok(())
    }
}
