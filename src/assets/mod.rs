mod loader;

pub use loader::{AsyncImageLoader, ImageSlot};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset directory {0} does not exist")]
    MissingRoot(PathBuf),
    #[error("failed to read asset directory {dir}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Selectable artwork discovered under the assets directory.
///
/// The layout mirrors the booth's asset folders: `backgrounds/`, `frames/`
/// and `stickers/`, each holding plain image files. A missing folder just
/// yields an empty list for that role.
pub struct AssetCatalog {
    pub backgrounds: Vec<PathBuf>,
    pub frames: Vec<PathBuf>,
    pub stickers: Vec<PathBuf>,
}

impl AssetCatalog {
    pub fn scan(root: &Path) -> Result<Self, AssetError> {
        if !root.is_dir() {
            return Err(AssetError::MissingRoot(root.to_path_buf()));
        }
        let catalog = Self {
            backgrounds: list_images(&root.join("backgrounds"))?,
            frames: list_images(&root.join("frames"))?,
            stickers: list_images(&root.join("stickers"))?,
        };
        tracing::info!(
            "Asset catalog: {} backgrounds, {} frames, {} stickers",
            catalog.backgrounds.len(),
            catalog.frames.len(),
            catalog.stickers.len()
        );
        Ok(catalog)
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, AssetError> {
    if !dir.is_dir() {
        tracing::debug!("No asset folder at {}", dir.display());
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| AssetError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_image(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref(),
        Some("png" | "jpg" | "jpeg" | "webp" | "bmp")
    )
}

/// Decoded sticker rasters, loaded once per path.
#[derive(Default)]
pub struct StickerCache {
    loaded: HashMap<PathBuf, Arc<RgbaImage>>,
}

impl StickerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sticker image for `path`, decoding on first use.
    ///
    /// A failed decode is logged and yields None; the booth stays as it
    /// was.
    pub fn fetch(&mut self, path: &Path) -> Option<Arc<RgbaImage>> {
        if let Some(img) = self.loaded.get(path) {
            return Some(Arc::clone(img));
        }
        match image::open(path) {
            Ok(img) => {
                let img = Arc::new(img.to_rgba8());
                self.loaded.insert(path.to_path_buf(), Arc::clone(&img));
                Some(img)
            }
            Err(e) => {
                tracing::warn!("Failed to load sticker {}: {e}", path.display());
                None
            }
        }
    }
}
