use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::core::item::Level;
use crate::core::role::Role;
use crate::decompose::{DecomposerConfig, DEFAULT_GENERATOR_TIMEOUT_SECS, DEFAULT_MAX_DEPTH};
use crate::orchestration::{CriticalPathMode, ExecutorConfig, PlannerConfig, DEFAULT_ITEM_TIMEOUT_SECS};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionSection {
    /// Granularity at which decomposition stops.
    pub target_level: Level,
    pub max_depth: usize,
    pub generator_timeout_secs: u64,
}

impl Default for DecompositionSection {
    fn default() -> Self {
        Self {
            target_level: Level::Task,
            max_depth: DEFAULT_MAX_DEPTH,
            generator_timeout_secs: DEFAULT_GENERATOR_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    pub item_timeout_secs: u64,
    /// Whether items no worker accepts go to a worker of `fallback_role`.
    pub fallback: bool,
    pub fallback_role: Role,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            item_timeout_secs: DEFAULT_ITEM_TIMEOUT_SECS,
            fallback: true,
            fallback_role: Role::Coordinator,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningSection {
    pub critical_path: CriticalPathMode,
}

/// Settings read from `~/.taskweave/taskweave.toml`.
///
/// Every key is optional; missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decomposition: DecompositionSection,
    pub execution: ExecutionSection,
    pub planning: PlanningSection,
}

impl Config {
    pub fn taskweave_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".taskweave"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::taskweave_dir()?.join("taskweave.toml"))
    }

    /// Load the user config, falling back to defaults when the file is missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        if !path.exists() {
            debug!("config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        debug!(?config, "config loaded");
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                debug!(dir = %dir.display(), "creating config directory");
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.decomposition.max_depth == 0 {
            return Err(Error::Config("decomposition.max_depth must be at least 1".to_string()));
        }
        if self.decomposition.generator_timeout_secs == 0 {
            return Err(Error::Config(
                "decomposition.generator_timeout_secs must be positive".to_string(),
            ));
        }
        if self.execution.item_timeout_secs == 0 {
            return Err(Error::Config("execution.item_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn decomposer_config(&self) -> DecomposerConfig {
        DecomposerConfig {
            max_depth: self.decomposition.max_depth,
            generator_timeout: Duration::from_secs(self.decomposition.generator_timeout_secs),
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            item_timeout: Duration::from_secs(self.execution.item_timeout_secs),
            fallback_role: self.execution.fallback.then_some(self.execution.fallback_role),
        }
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            critical_path: self.planning.critical_path,
        }
    }
}
