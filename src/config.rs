//! Registry configuration, loadable from TOML.
//!
//! ```toml
//! initial_capacity = 4096
//! max_cascade_depth = 32
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TmsResult};

/// Tuning knobs for a [`TripleRegistry`](crate::registry::TripleRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Capacity hint for the backing map (expected number of triples).
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// Maximum depth followed by the invalidation planners.
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: usize,
}

fn default_initial_capacity() -> usize {
    1024
}
fn default_max_cascade_depth() -> usize {
    64
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            max_cascade_depth: default_max_cascade_depth(),
        }
    }
}

impl RegistryConfig {
    /// Reject configurations the registry cannot work with.
    pub fn validate(&self) -> TmsResult<()> {
        if self.max_cascade_depth == 0 {
            return Err(ConfigError::Invalid {
                message: "max_cascade_depth must be > 0".into(),
            }
            .into());
        }
        Ok(())
    }

    /// Load and validate a config from a TOML file.
    pub fn load(path: &Path) -> TmsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> TmsResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TmsError;

    #[test]
    fn defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.initial_capacity, 1024);
        assert_eq!(config.max_cascade_depth, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: RegistryConfig = toml::from_str("max_cascade_depth = 8").unwrap();
        assert_eq!(config.initial_capacity, 1024);
        assert_eq!(config.max_cascade_depth, 8);
    }

    #[test]
    fn zero_depth_is_invalid() {
        let config = RegistryConfig {
            max_cascade_depth: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TmsError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tms.toml");
        let config = RegistryConfig {
            initial_capacity: 16,
            max_cascade_depth: 3,
        };
        config.save(&path).unwrap();
        assert_eq!(RegistryConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn save_over_directory_reports_write_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = RegistryConfig::default().save(dir.path()).unwrap_err();
        assert!(matches!(err, TmsError::Config(ConfigError::Write { .. })));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = RegistryConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, TmsError::Config(ConfigError::Read { .. })));
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tms.toml");
        std::fs::write(&path, "max_cascade_depth = \"deep\"").unwrap();
        let err = RegistryConfig::load(&path).unwrap_err();
        assert!(matches!(err, TmsError::Config(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_validates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tms.toml");
        std::fs::write(&path, "max_cascade_depth = 0").unwrap();
        let err = RegistryConfig::load(&path).unwrap_err();
        assert!(matches!(err, TmsError::Config(ConfigError::Invalid { .. })));
    }
}
