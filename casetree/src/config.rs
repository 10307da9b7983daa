//! Runner configuration.
//!
//! Config file resolution order:
//! 1. Explicit path passed to `RunnerConfig::load()`
//! 2. CTQ_CONFIG environment variable
//! 3. `ctq.toml` in the working directory
//! 4. `ctq.toml` in the platform config directory
//! 5. Defaults

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "ctq.toml";
pub const CONFIG_ENV_VAR: &str = "CTQ_CONFIG";

/// Settings for a `ctq run`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Keep debug-level case logs.
    pub debug: bool,

    /// Print every case as it finishes.
    pub verbose: bool,

    /// Print the results as JSON after the summary.
    pub print_json: bool,

    /// Expectations file; relative paths are relative to the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectations: Option<PathBuf>,
}

impl RunnerConfig {
    /// Load using the standard resolution order.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from(path);
        }
        match resolve_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific file, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let mut config: RunnerConfig = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        if let (Some(expectations), Some(dir)) = (&config.expectations, path.parent()) {
            if expectations.is_relative() {
                config.expectations = Some(dir.join(expectations));
            }
        }
        tracing::debug!(target: "casetree::config", path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply command-line flags. Flags can only switch settings on.
    pub fn with_overrides(
        mut self,
        debug: bool,
        verbose: bool,
        print_json: bool,
        expectations: Option<PathBuf>,
    ) -> Self {
        self.debug |= debug;
        self.verbose |= verbose;
        self.print_json |= print_json;
        if expectations.is_some() {
            self.expectations = expectations;
        }
        self
    }
}

/// Find the config file using the standard resolution order.
fn resolve_config_path() -> Option<PathBuf> {
    // 1. Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    // 2. Working directory
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    // 3. Platform config directory (via directories crate)
    ProjectDirs::from("", "", "ctq")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}
