//! Sprite sheet list and clock settings loaded from an INI file.
//!
//! # Configuration File Format
//!
//! ```ini
//! [loader]
//! root = assets/sprites
//! sheets = characters, enemies
//!
//! [characters]
//! image = spritesheet-characters-default.png
//! metadata = spritesheet-characters-default.xml
//! format = xml
//!
//! [enemies]
//! image = spritesheet-enemies-default.png
//! metadata = spritesheet-enemies-default.txt
//!
//! [clock]
//! target_fps = 60
//! ```
//!
//! `sheets` fixes the load order. Each listed id needs its own section with
//! `image` and `metadata`; `format` is optional and falls back to the
//! metadata file extension (`.xml` is XML, anything else TXT). Keys and
//! section names are case-sensitive.

use std::path::{Path, PathBuf};

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use thiserror::Error;

use crate::resources::assetsource::FileSource;
use crate::resources::spriteatlas::{MetadataFormat, SheetConfig};
use crate::resources::spriteloader::SpriteLoader;

const DEFAULT_TARGET_FPS: u32 = 60;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to load config file: {0}")]
    Load(String),
    #[error("missing key '{key}' in section [{section}]")]
    Missing { section: String, key: String },
    #[error("sheet '{sheet}': invalid metadata format '{value}'")]
    InvalidFormat { sheet: String, value: String },
}

/// Loader configuration resource.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Directory every sheet path is relative to. Relative roots resolve
    /// against the directory holding the config file.
    pub root: PathBuf,
    /// Sheets in load order.
    pub sheets: Vec<SheetConfig>,
    /// Pulse rate of the animation clock.
    pub target_fps: u32,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("."),
            sheets: Vec::new(),
            target_fps: DEFAULT_TARGET_FPS,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load the sheet list from `config_path`, replacing any previous list.
    pub fn load_from_file(&mut self) -> Result<(), ConfigError> {
        let mut config = Ini::new_cs();
        config.load(&self.config_path).map_err(ConfigError::Load)?;
        self.apply(&config)?;

        info!(
            "Loaded config: {} sheet(s) from {}, root={}, fps={}",
            self.sheets.len(),
            self.config_path.display(),
            self.root.display(),
            self.target_fps
        );
        Ok(())
    }

    /// Parse INI text directly; `config_path` only anchors a relative root.
    pub fn load_from_str(&mut self, content: &str) -> Result<(), ConfigError> {
        let mut config = Ini::new_cs();
        config.read(content.to_string()).map_err(ConfigError::Load)?;
        self.apply(&config)
    }

    fn apply(&mut self, config: &Ini) -> Result<(), ConfigError> {
        let base = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let root = config
            .get("loader", "root")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let root = if root.is_relative() { base.join(root) } else { root };

        let list = required(config, "loader", "sheets")?;
        let mut sheets = Vec::new();
        for id in list.split(',').map(str::trim).filter(|id| !id.is_empty()) {
            let image = required(config, id, "image")?;
            let metadata = required(config, id, "metadata")?;
            let format = match config.get(id, "format") {
                Some(value) => {
                    value
                        .parse::<MetadataFormat>()
                        .map_err(|_| ConfigError::InvalidFormat {
                            sheet: id.to_string(),
                            value: value.clone(),
                        })?
                }
                None => format_from_extension(&metadata),
            };
            sheets.push(SheetConfig::new(id, image, metadata, format));
        }

        if let Some(fps) = config.getuint("clock", "target_fps").ok().flatten() {
            self.target_fps = (fps as u32).max(1);
        }
        self.root = root;
        self.sheets = sheets;
        Ok(())
    }

    /// Build a file-backed loader over the configured sheets.
    pub fn build_loader(&self) -> SpriteLoader {
        SpriteLoader::new(FileSource::new(&self.root), self.sheets.clone())
    }

    pub fn sheet(&self, id: &str) -> Option<&SheetConfig> {
        self.sheets.iter().find(|sheet| sheet.id == id)
    }
}

fn required(config: &Ini, section: &str, key: &str) -> Result<String, ConfigError> {
    config
        .get(section, key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn format_from_extension(path: &str) -> MetadataFormat {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xml") => MetadataFormat::Xml,
        _ => MetadataFormat::Txt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[loader]
root = sprites
sheets = characters, enemies

[characters]
image = spritesheet-characters-default.png
metadata = spritesheet-characters-default.xml

[enemies]
image = spritesheet-enemies-default.png
metadata = enemies.data
format = TXT

[clock]
target_fps = 30
";

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::new();
        assert_eq!(config.target_fps, 60);
        assert!(config.sheets.is_empty());
        assert_eq!(config.config_path, PathBuf::from("./config.ini"));
    }

    #[test]
    fn test_load_from_str_keeps_sheet_order() {
        let mut config = LoaderConfig::with_path("assets/config.ini");
        config.load_from_str(SAMPLE).unwrap();

        assert_eq!(config.root, PathBuf::from("assets/sprites"));
        assert_eq!(config.target_fps, 30);
        let ids: Vec<&str> = config.sheets.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["characters", "enemies"]);
        assert_eq!(config.sheets[0].metadata_type, MetadataFormat::Xml);
        assert_eq!(config.sheets[1].metadata_type, MetadataFormat::Txt);
        assert_eq!(
            config.sheet("characters").unwrap().image_path,
            "spritesheet-characters-default.png"
        );
    }

    #[test]
    fn test_missing_key_is_named() {
        let mut config = LoaderConfig::new();
        let err = config
            .load_from_str("[loader]\nsheets = tiles\n\n[tiles]\nimage = tiles.png\n")
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                section: "tiles".to_string(),
                key: "metadata".to_string()
            }
        );
        assert!(config.sheets.is_empty());
    }

    #[test]
    fn test_invalid_format() {
        let mut config = LoaderConfig::new();
        let err = config
            .load_from_str("[loader]\nsheets = a\n\n[a]\nimage = a.png\nmetadata = a.xml\nformat = json\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat { ref sheet, .. } if sheet == "a"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("sheetanim_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.ini");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut config = LoaderConfig::with_path(&path);
        config.load_from_file().unwrap();
        assert_eq!(config.root, dir.join("sprites"));
        assert_eq!(config.sheets.len(), 2);
        assert_eq!(config.build_loader().configs().len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file() {
        let mut config = LoaderConfig::with_path("/nonexistent/sheetanim.ini");
        assert!(matches!(config.load_from_file(), Err(ConfigError::Load(_))));
    }
}
