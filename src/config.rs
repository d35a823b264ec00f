//! @ai:module:intent Configuration file for the generator
//! @ai:module:layer infrastructure
//! @ai:module:public_api GeneratorConfig, StubsConfig, RuntimeConfig, ValidationConfig
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::stubs::StubLibrary;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "sgxgen.toml";

/// @ai:intent Top-level generator configuration
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub stubs: StubsConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// @ai:intent Where stub templates come from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StubsConfig {
    /// Directory overriding the built-in templates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// @ai:intent Values baked into the generated module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

/// @ai:intent Input project checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_verify_project")]
    pub verify_project: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_threads: default_num_threads(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            verify_project: default_verify_project(),
        }
    }
}

fn default_num_threads() -> usize {
    1
}

fn default_verify_project() -> bool {
    true
}

impl GeneratorConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// @ai:intent Save configuration to a TOML file
    /// @ai:effects fs:write
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| Error::io(path, e))
    }

    /// @ai:effects pure
    pub fn validate(&self) -> Result<()> {
        if self.runtime.num_threads == 0 {
            return Err(Error::Config("runtime.num_threads must be at least 1".to_string()));
        }
        Ok(())
    }

    /// @ai:intent Stub library selected by this configuration
    /// @ai:effects pure
    pub fn stub_library(&self) -> StubLibrary {
        match &self.stubs.dir {
            Some(dir) => StubLibrary::Directory(dir.clone()),
            None => StubLibrary::Builtin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.runtime.num_threads, 1);
        assert!(config.validation.verify_project);
        assert_eq!(config.stub_library(), StubLibrary::Builtin);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: GeneratorConfig = toml::from_str("[runtime]\nnum_threads = 4\n").unwrap();
        assert_eq!(config.runtime.num_threads, 4);
        assert!(config.validation.verify_project);
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);

        let mut config = GeneratorConfig::default();
        config.stubs.dir = Some(PathBuf::from("my-stubs"));
        config.validation.verify_project = false;
        config.save(&path).unwrap();

        let loaded = GeneratorConfig::load(&path).unwrap();
        assert_eq!(loaded.stubs.dir, Some(PathBuf::from("my-stubs")));
        assert!(!loaded.validation.verify_project);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[runtime]\nnum_threads = 0\n").unwrap();

        assert!(matches!(GeneratorConfig::load(&path), Err(Error::Config(_))));
    }
}
