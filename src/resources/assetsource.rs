//! Byte sources for sheet images and metadata.
//!
//! The loader never touches the file system directly; it asks an
//! [`AssetSource`] for the bytes behind a path. [`FileSource`] reads from a
//! root directory, [`MemorySource`] serves preloaded buffers (tests, embedded
//! assets).

use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("asset '{path}' not found")]
    NotFound { path: String },
    #[error("failed to read asset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Something that can hand out the raw bytes of an asset path.
///
/// Implementations are shared between the two fetch threads of a sheet, so
/// they must be `Send + Sync`.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Reads assets relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FileSource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound {
                path: full.display().to_string(),
            },
            _ => FetchError::Io {
                path: full.display().to_string(),
                source: e,
            },
        })
    }
}

/// In-memory asset table keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: FxHashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(path.into(), bytes.into());
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        self.assets
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_roundtrip_and_miss() {
        let source = MemorySource::new().with("a.txt", "hello");
        assert_eq!(source.fetch("a.txt").unwrap(), b"hello".to_vec());
        assert!(matches!(
            source.fetch("b.txt"),
            Err(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn test_file_source_missing_file_is_not_found() {
        let source = FileSource::new(std::env::temp_dir());
        let result = source.fetch("sheetanim-definitely-missing-asset.png");
        assert!(matches!(result, Err(FetchError::NotFound { .. })));
    }
}
