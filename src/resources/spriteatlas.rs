//! Frame atlas data types.
//!
//! A sprite sheet is one bitmap plus a metadata file naming sub-rectangles
//! inside it. This module holds the parsed, immutable side of that pairing:
//! [`SpriteFrame`] rectangles keyed by name in a [`FrameMap`], wrapped per
//! sheet in a [`FrameAtlas`], plus the [`SheetConfig`] entries that tell the
//! loader where to fetch each sheet from.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Encoding of a sheet's metadata file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataFormat {
    /// Starling-style `<SubTexture name=".." x=".." .../>` elements.
    Xml,
    /// One `name x y width height` record per line.
    Txt,
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataFormat::Xml => write!(f, "xml"),
            MetadataFormat::Txt => write!(f, "txt"),
        }
    }
}

impl FromStr for MetadataFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(MetadataFormat::Xml),
            "txt" => Ok(MetadataFormat::Txt),
            other => Err(format!("unknown metadata format '{}'", other)),
        }
    }
}

/// Trim information for frames packed with transparent borders removed.
///
/// `offset_x`/`offset_y` follow the Starling convention: they are usually
/// zero or negative and place the packed rectangle inside the untrimmed
/// source frame of `source_width` x `source_height` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTrim {
    pub offset_x: i32,
    pub offset_y: i32,
    pub source_width: u32,
    pub source_height: u32,
}

/// Rectangle of one frame inside a sheet bitmap, in pixels from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteFrame {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Packed rotated 90 degrees clockwise.
    #[serde(default)]
    pub rotated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<FrameTrim>,
}

impl SpriteFrame {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotated: false,
            trim: None,
        }
    }
}

/// Frame rectangles keyed by name, iterated in insertion order.
///
/// Inserting a name that already exists replaces its rectangle but keeps the
/// position where the name was first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMap {
    order: Vec<String>,
    frames: FxHashMap<String, SpriteFrame>,
}

impl FrameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a frame. Returns the previous rectangle, if any.
    pub fn insert(&mut self, name: impl Into<String>, frame: SpriteFrame) -> Option<SpriteFrame> {
        let name = name.into();
        if let Some(existing) = self.frames.get_mut(&name) {
            return Some(std::mem::replace(existing, frame));
        }
        self.order.push(name.clone());
        self.frames.insert(name, frame);
        None
    }

    pub fn get(&self, name: &str) -> Option<&SpriteFrame> {
        self.frames.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Frame names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(name, frame)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpriteFrame)> {
        self.order
            .iter()
            .filter_map(|name| self.frames.get(name).map(|f| (name.as_str(), f)))
    }
}

/// Parsed metadata of one sheet together with its bitmap dimensions.
///
/// Built once by [`SpriteLoader`](crate::resources::spriteloader::SpriteLoader)
/// and never mutated after it has been published.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAtlas {
    pub id: String,
    pub image_path: String,
    pub image_width: u32,
    pub image_height: u32,
    pub frames: FrameMap,
}

impl FrameAtlas {
    pub fn frame(&self, name: &str) -> Option<&SpriteFrame> {
        self.frames.get(name)
    }
}

/// Where to fetch one sheet from and how to read its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetConfig {
    pub id: String,
    pub image_path: String,
    pub metadata_path: String,
    pub metadata_type: MetadataFormat,
}

impl SheetConfig {
    pub fn new(
        id: impl Into<String>,
        image_path: impl Into<String>,
        metadata_path: impl Into<String>,
        metadata_type: MetadataFormat,
    ) -> Self {
        Self {
            id: id.into(),
            image_path: image_path.into(),
            metadata_path: metadata_path.into(),
            metadata_type,
        }
    }
}
