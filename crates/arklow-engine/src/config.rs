//! Project configuration (arklow.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "arklow.toml";

/// Errors that can occur while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArklowConfig {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub lower: LowerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Project name recorded in every file signature
    #[serde(default = "default_project_name")]
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LowerConfig {
    /// Worker threads for the lowering driver (0 = one per CPU)
    #[serde(default)]
    pub jobs: usize,

    /// Name of the builtin object whose members are addressed statically
    #[serde(default = "default_prototype_root")]
    pub prototype_root: String,

    /// Attach source text snapshots to statements
    #[serde(default = "default_true")]
    pub origin_text: bool,

    /// File name used in builtin signatures
    #[serde(default = "default_builtin_file")]
    pub builtin_file: String,
}

impl Default for LowerConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            prototype_root: default_prototype_root(),
            origin_text: true,
            builtin_file: default_builtin_file(),
        }
    }
}

impl LowerConfig {
    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get().max(1)
        } else {
            self.jobs
        }
    }
}

fn default_project_name() -> String {
    "default".to_string()
}

fn default_prototype_root() -> String {
    "Object".to_string()
}

fn default_builtin_file() -> String {
    crate::ir::signature::BUILTIN_FILE.to_string()
}

fn default_true() -> bool {
    true
}

impl ArklowConfig {
    /// Parse a configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ArklowConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "Project name cannot be empty".to_string(),
            ));
        }
        if self.lower.prototype_root.is_empty() {
            return Err(ConfigError::ValidationError(
                "lower.prototype_root cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Find the nearest `arklow.toml` at or above `dir`.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        dir.ancestors()
            .map(|ancestor| ancestor.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load the nearest `arklow.toml`, or the defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        match Self::find(dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ArklowConfig::from_str("").unwrap();
        assert_eq!(config, ArklowConfig::default());
        assert_eq!(config.lower.prototype_root, "Object");
        assert!(config.lower.origin_text);
        assert!(config.lower.worker_count() >= 1);
    }

    #[test]
    fn test_partial_override() {
        let config = ArklowConfig::from_str(
            r#"
[project]
name = "demo"

[lower]
jobs = 2
origin_text = false
"#,
        )
        .unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.lower.worker_count(), 2);
        assert!(!config.lower.origin_text);
        assert_eq!(config.lower.builtin_file, "%builtin");
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            ArklowConfig::from_str("[project]\nname = \"\"\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            ArklowConfig::from_str("[lower]\njobs = \"many\"\n"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
