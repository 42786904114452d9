use crate::error::{Result, SyncError};
use crate::paths;
use crate::types::{StatusId, TrackerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

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
// Config
// ---------------------------------------------------------------------------

/// Process-wide settings, read once at startup.
///
/// `default_statuses` is the fallback status set for projects without
/// overrides and always contributes to the status universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub tracker: TrackerId,
    #[serde(default)]
    pub default_statuses: Vec<StatusId>,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(tracker: TrackerId, default_statuses: Vec<StatusId>) -> Self {
        Self {
            version: default_version(),
            tracker,
            default_statuses,
        }
    }

    pub fn default_status_set(&self) -> BTreeSet<StatusId> {
        self.default_statuses.iter().copied().collect()
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SyncError::NotInitialized);
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

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.tracker.0 == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "tracker is not set (0)".to_string(),
            });
        }

        if self.default_statuses.iter().any(|s| s.0 == 0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "default_statuses contains status 0".to_string(),
            });
        }
        if self.default_statuses.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "default_statuses is empty: projects without overrides get no transitions"
                    .to_string(),
            });
        }

        let mut seen = HashSet::new();
        for status in &self.default_statuses {
            if !seen.insert(status) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("status {status} is listed more than once in default_statuses"),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
