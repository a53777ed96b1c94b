use bevy_ecs::prelude::Component;

use crate::resources::spriteatlas::SpriteFrame;

/// Sprite is identified by a sheet id and the name of a frame in that sheet.
/// `frame` holds the resolved rectangle once the sheet is loaded; it stays
/// `None` while the name cannot be resolved.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct Sprite {
    pub sheet_id: String,
    pub frame_name: String,
    pub frame: Option<SpriteFrame>,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl Sprite {
    pub fn new(sheet_id: impl Into<String>, frame_name: impl Into<String>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            frame_name: frame_name.into(),
            frame: None,
            flip_h: false,
            flip_v: false,
        }
    }

    pub fn flipped(mut self, flip_h: bool, flip_v: bool) -> Self {
        self.flip_h = flip_h;
        self.flip_v = flip_v;
        self
    }

    /// Point the sprite at another frame; the rectangle is resolved again.
    pub fn set_frame_name(&mut self, frame_name: impl Into<String>) {
        self.frame_name = frame_name.into();
        self.frame = None;
    }
}
