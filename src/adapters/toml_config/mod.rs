// TOML config adapter - Configuration loaded from TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::*;
use crate::domain::rules::{MergePreflight, DEFAULT_STRIP_FRAMES};
use crate::ports::LogLevel;

/// Application configuration
///
/// Lives under a `[videostudio]` table in the config file. Missing keys take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub output_dir: PathBuf,
    pub log_level: String,
    pub log_json: bool,
    pub thumbnail_count: usize,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub merge_preflight: MergePreflight,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            output_dir: PathBuf::from("."),
            log_level: "info".to_string(),
            log_json: false,
            thumbnail_count: DEFAULT_STRIP_FRAMES,
            thumbnail_width: 100,
            thumbnail_height: 60,
            merge_preflight: MergePreflight::Warn,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    videostudio: StudioConfig,
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Default config file location
    pub fn default_config_path() -> PathBuf {
        if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(dir).join("videostudio").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("videostudio")
                .join("config.toml")
        } else if let Some(appdata) = std::env::var_os("APPDATA") {
            PathBuf::from(appdata).join("VideoStudio").join("config.toml")
        } else {
            PathBuf::from("videostudio.toml")
        }
    }

    /// Parse a TOML document
    pub fn parse(toml_content: &str) -> Result<StudioConfig, DomainError> {
        let parsed: ConfigFile = toml::from_str(toml_content)
            .map_err(|e| DomainError::BadArgs(format!("Failed to parse TOML config: {}", e)))?;
        Ok(parsed.videostudio)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<StudioConfig, DomainError> {
        if !path.exists() {
            return Err(DomainError::FsFail(format!(
                "Config file does not exist: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::FsFail(format!("Failed to read config file: {}", e)))?;
        let config = Self::parse(&content)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load the default file when present, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<StudioConfig, DomainError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(StudioConfig::default())
                }
            }
        }
    }

    /// Serialize to the on-disk layout
    pub fn serialize(config: &StudioConfig) -> Result<String, DomainError> {
        toml::to_string_pretty(&ConfigFile {
            videostudio: config.clone(),
        })
        .map_err(|e| DomainError::BadArgs(format!("Failed to serialize config: {}", e)))
    }

    pub fn save(config: &StudioConfig, path: &Path) -> Result<(), DomainError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DomainError::FsFail(format!("Failed to create config directory: {}", e))
            })?;
        }
        std::fs::write(path, Self::serialize(config)?)
            .map_err(|e| DomainError::FsFail(format!("Failed to write config file: {}", e)))
    }

    pub fn validate(config: &StudioConfig) -> Result<(), DomainError> {
        LogLevel::parse(&config.log_level)?;

        if config.thumbnail_count == 0 {
            return Err(DomainError::BadArgs(
                "thumbnail_count must be at least 1".to_string(),
            ));
        }
        if config.thumbnail_width == 0 || config.thumbnail_height == 0 {
            return Err(DomainError::BadArgs(format!(
                "Invalid thumbnail size {}x{}",
                config.thumbnail_width, config.thumbnail_height
            )));
        }
        if config.ffmpeg_path.as_os_str().is_empty() || config.ffprobe_path.as_os_str().is_empty() {
            return Err(DomainError::BadArgs(
                "ffmpeg_path and ffprobe_path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.thumbnail_count, 12);
        assert_eq!((config.thumbnail_width, config.thumbnail_height), (100, 60));
        assert_eq!(config.merge_preflight, MergePreflight::Warn);
        assert!(TomlConfigAdapter::validate(&config).is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = TomlConfigAdapter::parse(
            r#"
            [videostudio]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            merge_preflight = "reject"
            thumbnail_count = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.merge_preflight, MergePreflight::Reject);
        assert_eq!(config.thumbnail_count, 6);
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
    }

    #[test]
    fn test_parse_rejects_unknown_policy() {
        let result = TomlConfigAdapter::parse("[videostudio]\nmerge_preflight = \"maybe\"\n");
        assert!(matches!(result, Err(DomainError::BadArgs(_))));
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let config = StudioConfig {
            thumbnail_width: 0,
            ..StudioConfig::default()
        };
        assert!(TomlConfigAdapter::validate(&config).is_err());

        let config = StudioConfig {
            log_level: "loud".to_string(),
            ..StudioConfig::default()
        };
        assert!(TomlConfigAdapter::validate(&config).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = StudioConfig {
            output_dir: PathBuf::from("/tmp/out"),
            log_json: true,
            ..StudioConfig::default()
        };

        TomlConfigAdapter::save(&config, &path).unwrap();
        assert_eq!(TomlConfigAdapter::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let result = TomlConfigAdapter::load(Path::new("/nonexistent/videostudio.toml"));
        assert!(matches!(result, Err(DomainError::FsFail(_))));
    }
}
