//! Animation definitions and reusable animation tables.
//!
//! An [`AnimationConfig`] is the immutable description of a frame sequence:
//! which named frames to show, how fast, and whether to loop. Configs are
//! shared through `Arc` so any number of running instances can point at the
//! same definition.
//!
//! [`AnimationLibrary`] groups configs by a logical owner (an enemy type
//! table, a character color) and can be filled from JSON:
//!
//! ```json
//! {
//!   "enemies": {
//!     "bee_fly": { "frames": ["bee_a", "bee_b"], "fps": 12, "loop": true }
//!   }
//! }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use log::info;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnimationConfigError {
    #[error("animation '{name}' has no frames")]
    EmptyFrames { name: String },
    #[error("animation '{name}' has invalid fps {fps}")]
    InvalidFps { name: String, fps: f64 },
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to read animation library '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid animation library JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("group '{group}': {source}")]
    Config {
        group: String,
        #[source]
        source: AnimationConfigError,
    },
}

/// Immutable description of a named frame sequence.
///
/// `frames` may repeat a name to hold it for several steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    #[serde(default)]
    pub name: String,
    pub frames: Vec<String>,
    /// Frames advanced per second.
    pub fps: f64,
    #[serde(rename = "loop")]
    pub looped: bool,
}

impl AnimationConfig {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        frames: impl IntoIterator<Item = S>,
        fps: f64,
        looped: bool,
    ) -> Result<Self, AnimationConfigError> {
        let config = Self {
            name: name.into(),
            frames: frames.into_iter().map(Into::into).collect(),
            fps,
            looped,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnimationConfigError> {
        if self.frames.is_empty() {
            return Err(AnimationConfigError::EmptyFrames {
                name: self.name.clone(),
            });
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(AnimationConfigError::InvalidFps {
                name: self.name.clone(),
                fps: self.fps,
            });
        }
        Ok(())
    }

    /// Duration of one frame step in milliseconds.
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 / self.fps
    }

    /// Duration of one pass over every frame in milliseconds.
    pub fn cycle_duration_ms(&self) -> f64 {
        self.frame_duration_ms() * self.frames.len() as f64
    }
}

/// Player character palettes available in the characters sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterColor {
    Beige,
    Green,
    Pink,
    Purple,
    Yellow,
}

impl CharacterColor {
    pub const ALL: [CharacterColor; 5] = [
        CharacterColor::Beige,
        CharacterColor::Green,
        CharacterColor::Pink,
        CharacterColor::Purple,
        CharacterColor::Yellow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CharacterColor::Beige => "beige",
            CharacterColor::Green => "green",
            CharacterColor::Pink => "pink",
            CharacterColor::Purple => "purple",
            CharacterColor::Yellow => "yellow",
        }
    }
}

impl fmt::Display for CharacterColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the full animation set of one player character color.
///
/// Frame names follow the `character_<color>_<pose>` convention of the
/// characters sheet.
pub fn character_animations(color: CharacterColor) -> FxHashMap<String, Arc<AnimationConfig>> {
    let prefix = format!("character_{}", color);
    let f = |pose: &str| format!("{}_{}", prefix, pose);

    let table: [(&str, Vec<String>, f64); 7] = [
        ("idle", vec![f("idle")], 1.0),
        ("walk", vec![f("walk_a"), f("walk_b")], 8.0),
        (
            "jump",
            vec![
                f("walk_a"),
                f("walk_b"),
                f("jump"),
                f("jump"),
                f("jump"),
                f("duck"),
                f("walk_a"),
                f("walk_b"),
            ],
            10.0,
        ),
        ("duck", vec![f("idle"), f("duck"), f("duck"), f("duck")], 4.0),
        ("hit", vec![f("hit"), f("hit"), f("idle")], 3.0),
        ("climb", vec![f("climb_a"), f("climb_b")], 6.0),
        ("front", vec![f("front")], 1.0),
    ];

    table
        .into_iter()
        .map(|(name, frames, fps)| {
            let config = AnimationConfig {
                name: name.to_string(),
                frames,
                fps,
                looped: true,
            };
            (name.to_string(), Arc::new(config))
        })
        .collect()
}

/// Animation tables grouped by owner, e.g. `"enemies"` or `"character_green"`.
#[derive(Resource, Debug, Clone, Default)]
pub struct AnimationLibrary {
    groups: FxHashMap<String, FxHashMap<String, Arc<AnimationConfig>>>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library preloaded with one `character_<color>` group per color.
    pub fn with_characters() -> Self {
        let mut library = Self::new();
        for color in CharacterColor::ALL {
            library.insert_group(format!("character_{}", color), character_animations(color));
        }
        library
    }

    /// Parse groups from JSON and validate every config.
    ///
    /// A config without a `name` takes the key it is stored under.
    pub fn from_json_str(json: &str) -> Result<Self, LibraryError> {
        let raw: FxHashMap<String, FxHashMap<String, AnimationConfig>> =
            serde_json::from_str(json)?;
        let mut library = Self::new();
        for (group, animations) in raw {
            let mut table = FxHashMap::default();
            for (key, mut config) in animations {
                if config.name.is_empty() {
                    config.name = key.clone();
                }
                config.validate().map_err(|e| LibraryError::Config {
                    group: group.clone(),
                    source: e,
                })?;
                table.insert(key, Arc::new(config));
            }
            library.insert_group(group, table);
        }
        Ok(library)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| LibraryError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let library = Self::from_json_str(&json)?;
        info!(
            "Loaded {} animation group(s) from {}",
            library.groups.len(),
            path.display()
        );
        Ok(library)
    }

    /// Add or replace a whole group.
    pub fn insert_group(
        &mut self,
        group: impl Into<String>,
        animations: FxHashMap<String, Arc<AnimationConfig>>,
    ) {
        self.groups.insert(group.into(), animations);
    }

    /// Merge another library into this one; groups of `other` win.
    pub fn extend(&mut self, other: AnimationLibrary) {
        self.groups.extend(other.groups);
    }

    pub fn get(&self, group: &str, name: &str) -> Option<Arc<AnimationConfig>> {
        self.groups.get(group)?.get(name).cloned()
    }

    pub fn group(&self, group: &str) -> Option<&FxHashMap<String, Arc<AnimationConfig>>> {
        self.groups.get(group)
    }

    /// Group names, sorted.
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(AnimationConfig::new("ok", ["a"], 4.0, true).is_ok());
        assert_eq!(
            AnimationConfig::new("empty", Vec::<String>::new(), 4.0, true),
            Err(AnimationConfigError::EmptyFrames {
                name: "empty".to_string()
            })
        );
        assert!(matches!(
            AnimationConfig::new("zero", ["a"], 0.0, true),
            Err(AnimationConfigError::InvalidFps { .. })
        ));
        assert!(AnimationConfig::new("nan", ["a"], f64::NAN, true).is_err());
    }

    #[test]
    fn test_durations() {
        let config = AnimationConfig::new("walk", ["a", "b", "c", "d"], 10.0, true).unwrap();
        assert!((config.frame_duration_ms() - 100.0).abs() < 1e-9);
        assert!((config.cycle_duration_ms() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_character_animations_use_color_prefix() {
        let anims = character_animations(CharacterColor::Pink);
        assert_eq!(anims.len(), 7);
        let jump = &anims["jump"];
        assert_eq!(jump.frames.len(), 8);
        assert_eq!(jump.frames[2], "character_pink_jump");
        assert_eq!(jump.fps, 10.0);
        assert!(anims.values().all(|a| a.looped));
    }

    #[test]
    fn test_library_with_characters() {
        let library = AnimationLibrary::with_characters();
        assert_eq!(library.group_names().len(), 5);
        let walk = library.get("character_yellow", "walk").unwrap();
        assert_eq!(
            walk.frames,
            vec!["character_yellow_walk_a", "character_yellow_walk_b"]
        );
    }

    #[test]
    fn test_library_from_json_defaults_name_to_key() {
        let json = r#"{
            "enemies": {
                "bee_fly": { "frames": ["bee_a", "bee_b"], "fps": 12, "loop": true },
                "frog_jump": { "name": "hop", "frames": ["frog_idle", "frog_jump"], "fps": 6, "loop": false }
            }
        }"#;
        let library = AnimationLibrary::from_json_str(json).unwrap();
        let bee = library.get("enemies", "bee_fly").unwrap();
        assert_eq!(bee.name, "bee_fly");
        assert_eq!(bee.fps, 12.0);
        assert!(bee.looped);
        let frog = library.get("enemies", "frog_jump").unwrap();
        assert_eq!(frog.name, "hop");
        assert!(!frog.looped);
        assert!(library.get("enemies", "missing").is_none());
        assert!(library.get("missing", "bee_fly").is_none());
    }

    #[test]
    fn test_library_rejects_invalid_config() {
        let json = r#"{ "enemies": { "broken": { "frames": [], "fps": 12, "loop": true } } }"#;
        let err = AnimationLibrary::from_json_str(json).unwrap_err();
        assert!(matches!(err, LibraryError::Config { .. }));
    }
}
