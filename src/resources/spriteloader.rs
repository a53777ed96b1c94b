//! Sprite sheet loader and frame atlas cache.
//!
//! [`SpriteLoader`] turns a list of [`SheetConfig`] entries into a queryable
//! cache of [`FrameAtlas`] values and decoded images.
//!
//! # Loading
//!
//! [`SpriteLoader::preload_all`] walks the sheet list in order. For each sheet
//! the image and the metadata file are fetched on two scoped threads at the
//! same time; the image is decoded and the metadata parsed on those threads,
//! and both are joined before the next sheet starts, so progress only ever
//! moves forward. Everything lands in a staging cache that replaces the
//! published one only after the last sheet succeeded. A failure anywhere
//! aborts the preload and publishes nothing.
//!
//! # Lookups
//!
//! All queries are plain map reads and return `None` for unknown ids and
//! before the first successful preload. [`SpriteLoader::get_frame`] also
//! accepts frame names authored with a sheet prefix: `walk01` on sheet `p1`
//! resolves `p1_walk01` when `walk01` itself is not in the atlas.

use std::sync::Arc;
use std::thread;

use bevy_ecs::prelude::Resource;
use crossbeam_channel::{Receiver, Sender, unbounded};
use image::DynamicImage;
use log::{debug, error, info, warn};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::events::loading::LoadMessage;
use crate::metadata::{MetadataError, parse_metadata};
use crate::resources::assetsource::{AssetSource, FetchError};
use crate::resources::spriteatlas::{FrameAtlas, SheetConfig, SpriteFrame};

/// Failure of a whole preload. Identifies the sheet that broke it.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("sheet '{sheet}': {source}")]
    Fetch {
        sheet: String,
        #[source]
        source: FetchError,
    },
    #[error("sheet '{sheet}': failed to decode image '{path}': {source}")]
    Image {
        sheet: String,
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("sheet '{sheet}': metadata '{path}' is not valid UTF-8")]
    Encoding { sheet: String, path: String },
    #[error("sheet '{sheet}': failed to parse metadata '{path}': {source}")]
    Metadata {
        sheet: String,
        path: String,
        #[source]
        source: MetadataError,
    },
    #[error("sheet '{sheet}': fetch worker panicked")]
    WorkerPanicked { sheet: String },
}

impl LoadError {
    /// Id of the sheet that failed.
    pub fn sheet(&self) -> &str {
        match self {
            LoadError::Fetch { sheet, .. }
            | LoadError::Image { sheet, .. }
            | LoadError::Encoding { sheet, .. }
            | LoadError::Metadata { sheet, .. }
            | LoadError::WorkerPanicked { sheet } => sheet,
        }
    }
}

/// Loader and cache for every configured sprite sheet.
#[derive(Resource)]
pub struct SpriteLoader {
    source: Box<dyn AssetSource>,
    configs: Vec<SheetConfig>,
    sheets: FxHashMap<String, FrameAtlas>,
    images: FxHashMap<String, Arc<DynamicImage>>,
    sheet_order: Vec<String>,
    is_loading: bool,
    load_progress: u8,
    is_ready: bool,
    subscribers: Vec<Sender<LoadMessage>>,
}

impl SpriteLoader {
    pub fn new(source: impl AssetSource + 'static, configs: Vec<SheetConfig>) -> Self {
        Self {
            source: Box::new(source),
            configs,
            sheets: FxHashMap::default(),
            images: FxHashMap::default(),
            sheet_order: Vec::new(),
            is_loading: false,
            load_progress: 0,
            is_ready: false,
            subscribers: Vec::new(),
        }
    }

    /// Sheet configurations this loader was built with, in load order.
    pub fn configs(&self) -> &[SheetConfig] {
        &self.configs
    }

    /// Receive [`LoadMessage`]s for every subsequent preload.
    pub fn subscribe(&mut self) -> Receiver<LoadMessage> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Fetch, decode and parse every configured sheet, then publish the cache.
    ///
    /// Contract
    /// - Sheets are processed one at a time in configuration order; the image
    ///   and metadata of one sheet are fetched concurrently.
    /// - `load_progress` is `round(completed / total * 100)` after each sheet.
    /// - On success the new cache replaces the old one and `is_ready` is set.
    /// - On failure nothing is published and the error names the sheet. A
    ///   cache published earlier stays, together with its progress.
    pub fn preload_all(&mut self) -> Result<(), LoadError> {
        let configs = self.configs.clone();
        let total = configs.len();

        let published_progress = self.load_progress;
        self.is_loading = true;
        self.load_progress = 0;
        self.emit(LoadMessage::Started { total });
        info!("Preloading {} sprite sheet(s)", total);

        let mut sheets = FxHashMap::default();
        let mut images = FxHashMap::default();
        let mut order = Vec::with_capacity(total);

        for (index, config) in configs.iter().enumerate() {
            let (atlas, image) = match load_sheet(self.source.as_ref(), config) {
                Ok(loaded) => loaded,
                Err(e) => {
                    error!("Sprite preload aborted: {}", e);
                    self.is_loading = false;
                    // the old cache stays published, so does its progress
                    if self.is_ready {
                        self.load_progress = published_progress;
                    }
                    self.emit(LoadMessage::Failed {
                        id: config.id.clone(),
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            };

            let frame_count = atlas.frames.len();
            if sheets.insert(config.id.clone(), atlas).is_none() {
                order.push(config.id.clone());
            } else {
                warn!("Sheet id '{}' configured twice, keeping the last one", config.id);
            }
            images.insert(config.id.clone(), Arc::new(image));

            self.load_progress = progress_percent(index + 1, total);
            debug!(
                "Loaded sheet '{}' ({} frames), progress {}%",
                config.id, frame_count, self.load_progress
            );
            self.emit(LoadMessage::SheetLoaded {
                id: config.id.clone(),
                frames: frame_count,
                progress: self.load_progress,
            });
        }

        self.sheets = sheets;
        self.images = images;
        self.sheet_order = order;
        self.load_progress = 100;
        self.is_loading = false;
        self.is_ready = true;
        info!("Sprite sheets ready ({} loaded)", self.sheet_order.len());
        self.emit(LoadMessage::Finished {
            sheets: self.sheet_order.len(),
        });
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Completed sheets as an integer percentage of the configured total.
    pub fn load_progress(&self) -> u8 {
        self.load_progress
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    pub fn get_sheet(&self, id: &str) -> Option<&FrameAtlas> {
        self.sheets.get(id)
    }

    pub fn get_image(&self, id: &str) -> Option<Arc<DynamicImage>> {
        self.images.get(id).cloned()
    }

    /// Resolve `frame_name` in sheet `sheet_id`, falling back to
    /// `"<sheet_id>_<frame_name>"` when the bare name is not present.
    pub fn get_frame(&self, sheet_id: &str, frame_name: &str) -> Option<&SpriteFrame> {
        let sheet = self.sheets.get(sheet_id)?;
        sheet
            .frame(frame_name)
            .or_else(|| sheet.frame(&format!("{}_{}", sheet_id, frame_name)))
    }

    /// Loaded sheet ids in load order.
    pub fn sheet_ids(&self) -> Vec<&str> {
        self.sheet_order.iter().map(String::as_str).collect()
    }

    /// Frame names of a sheet in metadata order; empty for unknown sheets.
    pub fn frame_names(&self, id: &str) -> Vec<&str> {
        self.sheets
            .get(id)
            .map(|sheet| sheet.frames.names().collect())
            .unwrap_or_default()
    }

    fn emit(&mut self, message: LoadMessage) {
        self.subscribers.retain(|tx| tx.send(message.clone()).is_ok());
    }
}

fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// Fetch and decode one sheet. Image and metadata run on separate threads.
fn load_sheet(
    source: &dyn AssetSource,
    config: &SheetConfig,
) -> Result<(FrameAtlas, DynamicImage), LoadError> {
    let (image, atlas) = thread::scope(|s| {
        let image = s.spawn(|| fetch_image(source, config));
        let atlas = s.spawn(|| fetch_atlas(source, config));
        (image.join(), atlas.join())
    });
    let panicked = || LoadError::WorkerPanicked {
        sheet: config.id.clone(),
    };

    let image = image.map_err(|_| panicked())??;
    let mut atlas = atlas.map_err(|_| panicked())??;
    atlas.image_width = image.width();
    atlas.image_height = image.height();
    Ok((atlas, image))
}

fn fetch_image(source: &dyn AssetSource, config: &SheetConfig) -> Result<DynamicImage, LoadError> {
    let bytes = source
        .fetch(&config.image_path)
        .map_err(|e| LoadError::Fetch {
            sheet: config.id.clone(),
            source: e,
        })?;
    image::load_from_memory(&bytes).map_err(|e| LoadError::Image {
        sheet: config.id.clone(),
        path: config.image_path.clone(),
        source: e,
    })
}

fn fetch_atlas(source: &dyn AssetSource, config: &SheetConfig) -> Result<FrameAtlas, LoadError> {
    let bytes = source
        .fetch(&config.metadata_path)
        .map_err(|e| LoadError::Fetch {
            sheet: config.id.clone(),
            source: e,
        })?;
    let text = String::from_utf8(bytes).map_err(|_| LoadError::Encoding {
        sheet: config.id.clone(),
        path: config.metadata_path.clone(),
    })?;
    let parsed =
        parse_metadata(&text, config.metadata_type).map_err(|e| LoadError::Metadata {
            sheet: config.id.clone(),
            path: config.metadata_path.clone(),
            source: e,
        })?;
    if !parsed.skipped.is_empty() {
        debug!(
            "Sheet '{}': {} malformed metadata entr{} skipped",
            config.id,
            parsed.skipped.len(),
            if parsed.skipped.len() == 1 { "y" } else { "ies" }
        );
    }

    Ok(FrameAtlas {
        id: config.id.clone(),
        image_path: config.image_path.clone(),
        image_width: 0,
        image_height: 0,
        frames: parsed.frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::assetsource::MemorySource;
    use crate::resources::spriteatlas::MetadataFormat;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::new(width, height);
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn p1_source() -> MemorySource {
        MemorySource::new()
            .with("p1.png", png_bytes(48, 24))
            .with(
                "p1.txt",
                "p1_walk01 = 0 0 24 24\np1_walk02 = 24 0 24 24\nwalk02 = 0 0 1 1\n",
            )
    }

    fn p1_config() -> SheetConfig {
        SheetConfig::new("p1", "p1.png", "p1.txt", MetadataFormat::Txt)
    }

    #[test]
    fn test_progress_percent_rounds() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn test_lookups_absent_before_preload() {
        let loader = SpriteLoader::new(p1_source(), vec![p1_config()]);
        assert!(!loader.is_ready());
        assert!(loader.get_sheet("p1").is_none());
        assert!(loader.get_image("p1").is_none());
        assert!(loader.get_frame("p1", "p1_walk01").is_none());
        assert!(loader.sheet_ids().is_empty());
        assert!(loader.frame_names("p1").is_empty());
    }

    #[test]
    fn test_preload_publishes_atlas_and_image() {
        let mut loader = SpriteLoader::new(p1_source(), vec![p1_config()]);
        loader.preload_all().unwrap();

        assert!(loader.is_ready());
        assert!(!loader.is_loading());
        assert_eq!(loader.load_progress(), 100);

        let sheet = loader.get_sheet("p1").unwrap();
        assert_eq!((sheet.image_width, sheet.image_height), (48, 24));
        assert_eq!(sheet.image_path, "p1.png");
        let image = loader.get_image("p1").unwrap();
        assert_eq!(image.width(), 48);
        assert_eq!(
            loader.frame_names("p1"),
            vec!["p1_walk01", "p1_walk02", "walk02"]
        );
    }

    #[test]
    fn test_get_frame_prefix_fallback_only_when_bare_name_missing() {
        let mut loader = SpriteLoader::new(p1_source(), vec![p1_config()]);
        loader.preload_all().unwrap();

        // bare name absent, prefixed present
        assert_eq!(
            loader.get_frame("p1", "walk01"),
            Some(&SpriteFrame::new(0, 0, 24, 24))
        );
        // bare name present wins over the prefixed form
        assert_eq!(
            loader.get_frame("p1", "walk02"),
            Some(&SpriteFrame::new(0, 0, 1, 1))
        );
        assert!(loader.get_frame("p1", "walk03").is_none());
        assert!(loader.get_frame("nope", "walk01").is_none());
    }

    #[test]
    fn test_failed_preload_publishes_nothing() {
        let configs = vec![
            p1_config(),
            SheetConfig::new("missing", "missing.png", "missing.xml", MetadataFormat::Xml),
        ];
        let mut loader = SpriteLoader::new(p1_source(), configs);
        let err = loader.preload_all().unwrap_err();

        assert_eq!(err.sheet(), "missing");
        assert!(!loader.is_ready());
        assert!(!loader.is_loading());
        assert!(loader.get_sheet("p1").is_none());
        assert!(loader.sheet_ids().is_empty());
    }

    #[test]
    fn test_failed_reload_keeps_published_cache() {
        let dir = std::env::temp_dir().join(format!("sheetanim_reload_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.png"), png_bytes(16, 8)).unwrap();
        std::fs::write(dir.join("a.txt"), "left 0 0 8 8\nright 8 0 8 8\n").unwrap();

        let mut loader = SpriteLoader::new(
            crate::resources::assetsource::FileSource::new(&dir),
            vec![SheetConfig::new("a", "a.png", "a.txt", MetadataFormat::Txt)],
        );
        loader.preload_all().unwrap();

        // reads are idempotent
        let first = loader.get_frame("a", "right").copied();
        assert_eq!(first, Some(SpriteFrame::new(8, 0, 8, 8)));
        assert_eq!(loader.get_frame("a", "right").copied(), first);
        assert_eq!(loader.get_sheet("a"), loader.get_sheet("a"));

        std::fs::remove_file(dir.join("a.txt")).unwrap();
        let err = loader.preload_all().unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));

        assert!(loader.is_ready());
        assert!(!loader.is_loading());
        assert_eq!(loader.load_progress(), 100);
        assert_eq!(loader.get_frame("a", "right").copied(), first);
        assert_eq!(loader.get_sheet("a").map(|s| s.frames.len()), Some(2));
        assert!(loader.get_image("a").is_some());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_undecodable_image_fails_preload() {
        let source = p1_source().with("p1.png", b"not a png".to_vec());
        let mut loader = SpriteLoader::new(source, vec![p1_config()]);
        let err = loader.preload_all().unwrap_err();
        assert!(matches!(err, LoadError::Image { .. }));
    }

    #[test]
    fn test_subscriber_receives_progress_in_order() {
        let source = p1_source()
            .with("p2.png", png_bytes(8, 8))
            .with("p2.txt", "a 0 0 8 8\n");
        let configs = vec![
            p1_config(),
            SheetConfig::new("p2", "p2.png", "p2.txt", MetadataFormat::Txt),
        ];
        let mut loader = SpriteLoader::new(source, configs);
        let rx = loader.subscribe();
        loader.preload_all().unwrap();

        let messages: Vec<LoadMessage> = rx.try_iter().collect();
        assert_eq!(
            messages,
            vec![
                LoadMessage::Started { total: 2 },
                LoadMessage::SheetLoaded {
                    id: "p1".to_string(),
                    frames: 3,
                    progress: 50,
                },
                LoadMessage::SheetLoaded {
                    id: "p2".to_string(),
                    frames: 1,
                    progress: 100,
                },
                LoadMessage::Finished { sheets: 2 },
            ]
        );
    }

    struct SlowSource {
        inner: MemorySource,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl AssetSource for SlowSource {
        fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.fetch(path)
        }
    }

    #[test]
    fn test_image_and_metadata_fetched_concurrently() {
        let source = SlowSource {
            inner: p1_source(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        };
        let sheet = p1_config();
        let (atlas, _image) = load_sheet(&source, &sheet).unwrap();
        assert_eq!(atlas.frames.len(), 3);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 2);
    }
}
