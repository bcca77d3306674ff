//! Pass configuration, persisted as TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::infer::DEFAULT_TOP_TASK;

/// Which passes run, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Task the reachability walk starts from.
    #[serde(default = "default_top_task")]
    pub top_task: String,
    /// Run precondition inference.
    #[serde(default = "default_true")]
    pub infer_preconditions: bool,
    /// Split long totally ordered methods into binary ones.
    #[serde(default)]
    pub two_regularize: bool,
    /// Report the inference summary line.
    #[serde(default = "default_true")]
    pub report_statistics: bool,
}

fn default_top_task() -> String {
    DEFAULT_TOP_TASK.into()
}
fn default_true() -> bool {
    true
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            top_task: default_top_task(),
            infer_preconditions: true,
            two_regularize: false,
            report_statistics: true,
        }
    }
}

impl RefineConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: "<memory>".into(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
