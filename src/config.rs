//! Configuration file (dts-outline.toml) parsing and types.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use dts_outline::ParseOptions;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "dts-outline.toml";
pub const HOME_CONFIG_FILE: &str = ".dts-outline.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// How the outline is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// When to color text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color only when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

/// Root configuration structure for dts-outline.toml.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutlineConfig {
    #[serde(default)]
    pub parse: ParseConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Parser behaviour section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParseConfig {
    /// Link `extends` targets declared later in the same module.
    pub resolve_forward_extends: Option<bool>,
}

/// Output section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputConfig {
    pub format: Option<OutputFormat>,
    pub color: Option<ColorMode>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Print skip records to stderr after the outline.
    pub show_skips: Option<bool>,
}

impl OutlineConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise `./dts-outline.toml` is tried,
    /// then `~/.dts-outline.toml`, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(home) = simple_home_dir::home_dir() {
            candidates.push(home.join(HOME_CONFIG_FILE));
        }

        for path in candidates {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load_from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl ParseConfig {
    /// Get whether forward `extends` are resolved (default: false).
    pub fn resolve_forward_extends(&self) -> bool {
        self.resolve_forward_extends.unwrap_or(false)
    }

    pub fn options(&self) -> ParseOptions {
        ParseOptions {
            resolve_forward_extends: self.resolve_forward_extends(),
        }
    }
}

impl OutputConfig {
    /// Get the output format (default: text).
    pub fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// Get the color mode (default: auto).
    pub fn color(&self) -> ColorMode {
        self.color.unwrap_or_default()
    }

    /// Get whether JSON is pretty-printed (default: true).
    pub fn pretty(&self) -> bool {
        self.pretty.unwrap_or(true)
    }

    /// Get whether skips are printed (default: false).
    pub fn show_skips(&self) -> bool {
        self.show_skips.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = OutlineConfig::parse("").unwrap();
        assert!(!config.parse.resolve_forward_extends());
        assert_eq!(config.output.format(), OutputFormat::Text);
        assert_eq!(config.output.color(), ColorMode::Auto);
        assert!(config.output.pretty());
        assert!(!config.output.show_skips());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[parse]
resolve_forward_extends = true

[output]
format = "json"
color = "never"
pretty = false
show_skips = true
"#;
        let config = OutlineConfig::parse(toml).unwrap();
        assert!(config.parse.options().resolve_forward_extends);
        assert_eq!(config.output.format(), OutputFormat::Json);
        assert_eq!(config.output.color(), ColorMode::Never);
        assert!(!config.output.pretty());
        assert!(config.output.show_skips());
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        let toml = r#"
[output]
format = "yaml"
"#;
        assert!(OutlineConfig::parse(toml).is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[output]\nformat = \"json\"\n").unwrap();

        let config = OutlineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.output.format(), OutputFormat::Json);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = OutlineConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_invalid_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[parse\n").unwrap();

        let err = OutlineConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
