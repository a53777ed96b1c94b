//! Sprite sheet metadata parsing.
//!
//! Turns the raw text of a sheet's metadata file into a [`FrameMap`]. Two
//! encodings are understood:
//!
//! - `xml`: any element carrying a `name` attribute is a frame, with integer
//!   `x`, `y`, `width` and `height` attributes. This matches the Starling
//!   `TextureAtlas`/`SubTexture` layout:
//!
//!   ```xml
//!   <TextureAtlas imagePath="spritesheet-enemies-default.png">
//!       <SubTexture name="bee_a.png" x="0" y="0" width="64" height="64"/>
//!   </TextureAtlas>
//!   ```
//!
//!   Optional `rotated="true"` and trim attributes (`frameX`, `frameY`,
//!   `frameWidth`, `frameHeight`) are carried into [`SpriteFrame`].
//! - `txt`: one frame per line as `name x y width height`, whitespace
//!   separated, optionally with an `=` after the name. Blank lines and lines
//!   starting with `#` or `//` are ignored.
//!
//! Frame names are normalized the same way for both encodings: any directory
//! part is dropped and a trailing image extension is removed, so
//! `sheet/bee_a.png` becomes `bee_a`.
//!
//! A malformed entry never fails the sheet. It is left out of the map,
//! logged, and listed in [`ParsedMetadata::skipped`]. When a name appears
//! more than once the last entry wins.

use log::warn;
use thiserror::Error;

use crate::resources::spriteatlas::{FrameMap, FrameTrim, MetadataFormat, SpriteFrame};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Whole-document failure. Entry-level problems are reported through
/// [`SkippedEntry`] instead.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata is not well-formed XML: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// A metadata record that was dropped while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// 1-based line of the record in the source text.
    pub line: u32,
    /// Normalized frame name, when the record had one.
    pub name: Option<String>,
    pub reason: String,
}

/// Result of parsing one metadata file.
#[derive(Debug, Clone, Default)]
pub struct ParsedMetadata {
    pub frames: FrameMap,
    pub skipped: Vec<SkippedEntry>,
}

/// Parse `content` according to `format`.
///
/// Pure: no I/O, no shared state. Returns an error only when an `xml`
/// document cannot be read at all.
pub fn parse_metadata(
    content: &str,
    format: MetadataFormat,
) -> Result<ParsedMetadata, MetadataError> {
    let parsed = match format {
        MetadataFormat::Xml => parse_xml(content)?,
        MetadataFormat::Txt => parse_txt(content),
    };
    for entry in &parsed.skipped {
        warn!(
            "Skipping {} metadata entry at line {} ({}): {}",
            format,
            entry.line,
            entry.name.as_deref().unwrap_or("<unnamed>"),
            entry.reason
        );
    }
    Ok(parsed)
}

/// Strip any directory part and a trailing image extension from a frame name.
pub fn normalize_frame_name(raw: &str) -> String {
    let raw = raw.trim();
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    match base.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known)) =>
        {
            stem.to_string()
        }
        _ => base.to_string(),
    }
}

fn parse_xml(content: &str) -> Result<ParsedMetadata, MetadataError> {
    let doc = roxmltree::Document::parse(content)?;
    let mut parsed = ParsedMetadata::default();

    for node in doc.descendants().filter(|n| n.is_element()) {
        let Some(raw_name) = node.attribute("name") else {
            continue;
        };
        let line = doc.text_pos_at(node.range().start).row;
        let name = normalize_frame_name(raw_name);

        match xml_frame(&node) {
            Ok(frame) => {
                parsed.frames.insert(name, frame);
            }
            Err(reason) => parsed.skipped.push(SkippedEntry {
                line,
                name: Some(name),
                reason,
            }),
        }
    }

    Ok(parsed)
}

fn xml_frame(node: &roxmltree::Node) -> Result<SpriteFrame, String> {
    let bound = |attr: &str| -> Result<u32, String> {
        let value = node
            .attribute(attr)
            .ok_or_else(|| format!("missing '{}' attribute", attr))?;
        parse_u32(attr, value)
    };

    let mut frame = SpriteFrame::new(bound("x")?, bound("y")?, bound("width")?, bound("height")?);
    frame.rotated = node
        .attribute("rotated")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

    if let (Some(fx), Some(fy), Some(fw), Some(fh)) = (
        node.attribute("frameX"),
        node.attribute("frameY"),
        node.attribute("frameWidth"),
        node.attribute("frameHeight"),
    ) {
        frame.trim = Some(FrameTrim {
            offset_x: parse_i32("frameX", fx)?,
            offset_y: parse_i32("frameY", fy)?,
            source_width: parse_u32("frameWidth", fw)?,
            source_height: parse_u32("frameHeight", fh)?,
        });
    }

    Ok(frame)
}

fn parse_txt(content: &str) -> ParsedMetadata {
    let mut parsed = ParsedMetadata::default();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        let line_no = (index + 1) as u32;

        let mut fields: Vec<&str> = line.split_whitespace().collect();
        // `name = x y w h`
        if fields.get(1) == Some(&"=") {
            fields.remove(1);
        }
        let name = normalize_frame_name(fields[0]);

        match txt_frame(&fields[1..]) {
            Ok(frame) => {
                parsed.frames.insert(name, frame);
            }
            Err(reason) => parsed.skipped.push(SkippedEntry {
                line: line_no,
                name: Some(name),
                reason,
            }),
        }
    }

    parsed
}

fn txt_frame(fields: &[&str]) -> Result<SpriteFrame, String> {
    let [x, y, width, height] = fields else {
        return Err(format!(
            "expected 4 numeric fields after the name, found {}",
            fields.len()
        ));
    };
    Ok(SpriteFrame::new(
        parse_u32("x", x)?,
        parse_u32("y", y)?,
        parse_u32("width", width)?,
        parse_u32("height", height)?,
    ))
}

fn parse_u32(field: &str, value: &str) -> Result<u32, String> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid '{}' value '{}': {}", field, value, e))
}

fn parse_i32(field: &str, value: &str) -> Result<i32, String> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid '{}' value '{}': {}", field, value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENEMIES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TextureAtlas imagePath="spritesheet-enemies-default.png">
    <SubTexture name="bee_a.png" x="0" y="0" width="16" height="16"/>
    <SubTexture name="bee_b.png" x="16" y="0" width="16" height="16"/>
    <SubTexture name="saw_a.png" x="32" y="0" width="32" height="32"/>
</TextureAtlas>"#;

    #[test]
    fn test_normalize_frame_name() {
        assert_eq!(normalize_frame_name("bee_a.png"), "bee_a");
        assert_eq!(normalize_frame_name("enemies/bee_a.PNG"), "bee_a");
        assert_eq!(normalize_frame_name("tiles\\grass.webp"), "grass");
        assert_eq!(normalize_frame_name("walk01"), "walk01");
        assert_eq!(normalize_frame_name("v1.2"), "v1.2");
        assert_eq!(normalize_frame_name(".png"), ".png");
    }

    #[test]
    fn test_xml_well_formed_sheet() {
        let parsed = parse_metadata(ENEMIES_XML, MetadataFormat::Xml).unwrap();
        assert!(parsed.skipped.is_empty());
        assert_eq!(
            parsed.frames.names().collect::<Vec<_>>(),
            vec!["bee_a", "bee_b", "saw_a"]
        );
        assert_eq!(parsed.frames.get("bee_b"), Some(&SpriteFrame::new(16, 0, 16, 16)));
        assert_eq!(parsed.frames.get("saw_a"), Some(&SpriteFrame::new(32, 0, 32, 32)));
    }

    #[test]
    fn test_xml_corrupted_entry_is_skipped() {
        let xml = r#"<TextureAtlas>
    <SubTexture name="ok_a.png" x="0" y="0" width="8" height="8"/>
    <SubTexture name="broken.png" x="abc" y="0" width="8" height="8"/>
    <SubTexture name="ok_b.png" x="8" y="0" width="8" height="8"/>
</TextureAtlas>"#;
        let parsed = parse_metadata(xml, MetadataFormat::Xml).unwrap();

        assert_eq!(parsed.frames.len(), 2);
        assert!(parsed.frames.contains("ok_a"));
        assert!(parsed.frames.contains("ok_b"));
        assert!(!parsed.frames.contains("broken"));
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 3);
        assert_eq!(parsed.skipped[0].name.as_deref(), Some("broken"));
    }

    #[test]
    fn test_xml_missing_attribute_is_skipped() {
        let xml = r#"<TextureAtlas><SubTexture name="half.png" x="0" y="0" width="8"/></TextureAtlas>"#;
        let parsed = parse_metadata(xml, MetadataFormat::Xml).unwrap();
        assert!(parsed.frames.is_empty());
        assert!(parsed.skipped[0].reason.contains("height"));
    }

    #[test]
    fn test_xml_duplicate_last_wins() {
        let xml = r#"<TextureAtlas>
    <SubTexture name="dup.png" x="0" y="0" width="8" height="8"/>
    <SubTexture name="other.png" x="8" y="0" width="8" height="8"/>
    <SubTexture name="dup.png" x="16" y="0" width="4" height="4"/>
</TextureAtlas>"#;
        let parsed = parse_metadata(xml, MetadataFormat::Xml).unwrap();
        assert_eq!(parsed.frames.len(), 2);
        assert_eq!(parsed.frames.get("dup"), Some(&SpriteFrame::new(16, 0, 4, 4)));
        assert_eq!(parsed.frames.names().next(), Some("dup"));
    }

    #[test]
    fn test_xml_rotation_and_trim() {
        let xml = r#"<TextureAtlas>
    <SubTexture name="hero.png" x="2" y="4" width="10" height="12" rotated="true"
        frameX="-3" frameY="-1" frameWidth="16" frameHeight="16"/>
</TextureAtlas>"#;
        let parsed = parse_metadata(xml, MetadataFormat::Xml).unwrap();
        let frame = parsed.frames.get("hero").unwrap();
        assert!(frame.rotated);
        assert_eq!(
            frame.trim,
            Some(FrameTrim {
                offset_x: -3,
                offset_y: -1,
                source_width: 16,
                source_height: 16,
            })
        );
    }

    #[test]
    fn test_xml_not_well_formed_is_an_error() {
        let result = parse_metadata("<TextureAtlas><SubTexture", MetadataFormat::Xml);
        assert!(matches!(result, Err(MetadataError::Xml(_))));
    }

    #[test]
    fn test_txt_lines_comments_and_separators() {
        let txt = "# characters sheet\n\
                   \n\
                   character_green_idle = 0 0 24 24\n\
                   // walk cycle\n\
                   character_green_walk_a 24 0 24 24\n\
                   character_green_walk_b.png = 48 0 24 24\n";
        let parsed = parse_metadata(txt, MetadataFormat::Txt).unwrap();
        assert!(parsed.skipped.is_empty());
        assert_eq!(
            parsed.frames.names().collect::<Vec<_>>(),
            vec![
                "character_green_idle",
                "character_green_walk_a",
                "character_green_walk_b"
            ]
        );
        assert_eq!(
            parsed.frames.get("character_green_walk_b"),
            Some(&SpriteFrame::new(48, 0, 24, 24))
        );
    }

    #[test]
    fn test_txt_bad_lines_are_skipped() {
        let txt = "a 0 0 8 8\nb 0 0 8\nc 0 -1 8 8\nd 8 0 8 8";
        let parsed = parse_metadata(txt, MetadataFormat::Txt).unwrap();
        assert_eq!(parsed.frames.names().collect::<Vec<_>>(), vec!["a", "d"]);
        let lines: Vec<u32> = parsed.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[test]
    fn test_txt_duplicate_last_wins() {
        let txt = "a 0 0 8 8\na 1 1 2 2\n";
        let parsed = parse_metadata(txt, MetadataFormat::Txt).unwrap();
        assert_eq!(parsed.frames.len(), 1);
        assert_eq!(parsed.frames.get("a"), Some(&SpriteFrame::new(1, 1, 2, 2)));
    }
}
