//! Configuration file structure
//!
//! ```json
//! {
//!   "shape_dir": "./shapes",
//!   "validation_mode": "collect",
//!   "log_filter": "recordshape=debug"
//! }
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::schema::ValidationMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory of `*.json` shape files loaded next to the built-in catalog
    #[serde(default)]
    pub shape_dir: Option<PathBuf>,

    /// `fail_fast` (default) or `collect`
    #[serde(default)]
    pub validation_mode: ValidationMode,

    /// tracing filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shape_dir: None,
            validation_mode: ValidationMode::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config '{}': {}", path.display(), e))?;
        Self::from_json(&content)
    }

    /// Defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, String> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let config: Config =
            serde_json::from_str(content).map_err(|e| format!("Invalid config JSON: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.log_filter.trim().is_empty() {
            return Err("log_filter must not be empty".into());
        }
        if let Some(dir) = &self.shape_dir {
            if dir.as_os_str().is_empty() {
                return Err("shape_dir must not be empty".into());
            }
        }
        Ok(())
    }
}
