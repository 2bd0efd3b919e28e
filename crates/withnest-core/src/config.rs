//! Configuration schema (withnest.toml)

use serde::{Deserialize, Serialize};

/// Default cap on cross-join rewrite passes
pub const DEFAULT_MAX_CROSS_JOIN_PASSES: usize = 100;

/// Default suffix inserted before the `.sql` extension of the output file
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_nested";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of passes rewriting `from a, b` shorthand into `cross join`.
    ///
    /// A single pass only resolves two-item lists, so longer lists need
    /// repeated passes; the cap bounds work on pathological input.
    #[serde(default = "default_max_cross_join_passes")]
    pub max_cross_join_passes: usize,

    /// Suffix inserted before the `.sql` extension when writing the nested query
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// Echo the nested query to stdout after writing it
    #[serde(default = "default_print_query")]
    pub print_query: bool,
}

fn default_max_cross_join_passes() -> usize {
    DEFAULT_MAX_CROSS_JOIN_PASSES
}

fn default_output_suffix() -> String {
    DEFAULT_OUTPUT_SUFFIX.to_string()
}

fn default_print_query() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cross_join_passes: default_max_cross_join_passes(),
            output_suffix: default_output_suffix(),
            print_query: default_print_query(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.max_cross_join_passes, 100);
        assert_eq!(config.output_suffix, "_nested");
        assert!(config.print_query);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml("print_query = false").unwrap();
        assert!(!config.print_query);
        assert_eq!(config.max_cross_join_passes, DEFAULT_MAX_CROSS_JOIN_PASSES);
        assert_eq!(config.output_suffix, DEFAULT_OUTPUT_SUFFIX);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = Config::from_toml("max_cross_join_passes = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config {
            max_cross_join_passes: 7,
            output_suffix: "_flat".to_string(),
            print_query: false,
        };
        let toml = toml::to_string(&config).unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn save_and_reload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("withnest.toml");
        let config = Config {
            output_suffix: "_inline".to_string(),
            ..Config::default()
        };

        config.save_to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::from_file(std::path::Path::new("does/not/exist/withnest.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
