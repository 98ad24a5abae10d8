//! Configuration for a schema registry
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (overseer.toml)
//! - Environment variables (OVERSEER__*)
//!
//! ## Example config file (overseer.toml):
//! ```toml
//! discovery_paths = ["payload.models", "payload.builders"]
//! validate_output = true
//! check_for_single_valid_schema = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Registry configuration, fixed once the registry is constructed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Module paths expanded and loaded during `setup`, in order
    #[serde(default)]
    pub discovery_paths: Vec<String>,

    /// Run builder outputs through the output adapter
    #[serde(default)]
    pub validate_output: bool,

    /// Evaluate every schema and reject inputs matched by more than one
    #[serde(default)]
    pub check_for_single_valid_schema: bool,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_discovery_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.discovery_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_validate_output(mut self, enabled: bool) -> Self {
        self.validate_output = enabled;
        self
    }

    pub fn with_check_for_single_valid_schema(mut self, enabled: bool) -> Self {
        self.check_for_single_valid_schema = enabled;
        self
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["overseer.toml", ".overseer.toml", "config/overseer.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) =
            directories::ProjectDirs::from("dev", "overseer", "schema-overseer")
        {
            let xdg_config = config_dir.config_dir().join("overseer.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (OVERSEER__*)
        builder = builder.add_source(
            Environment::with_prefix("OVERSEER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("discovery_paths"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert!(config.discovery_paths.is_empty());
        assert!(!config.validate_output);
        assert!(!config.check_for_single_valid_schema);
    }

    #[test]
    fn test_builder_methods() {
        let config = RegistryConfig::new()
            .with_discovery_paths(["payload"])
            .with_validate_output(true)
            .with_check_for_single_valid_schema(true);
        assert_eq!(config.discovery_paths, vec!["payload".to_string()]);
        assert!(config.validate_output);
        assert!(config.check_for_single_valid_schema);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.toml");

        let config = RegistryConfig::new()
            .with_discovery_paths(["payload.models", "payload.builders"])
            .with_validate_output(true);
        config.save(&path).unwrap();

        let loaded = RegistryConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(RegistryConfig::load_from(Some(path.to_str().unwrap())).is_err());
    }
}
