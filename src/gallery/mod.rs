use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbaImage;

const MANIFEST: &str = "manifest.json";

/// One exported photo: the encoded PNG on disk plus its display handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedPhoto {
    pub path: PathBuf,
}

/// On-disk photo gallery with a JSON manifest.
///
/// The manifest is a plain list of file names, loaded at startup so saved
/// photos survive restarts. Saving encodes a PNG next to the manifest and
/// records it; clearing releases every handle by removing its file, so no
/// orphaned exports accumulate.
pub struct Gallery {
    dir: PathBuf,
    photos: Vec<SavedPhoto>,
    next_id: u32,
}

impl Gallery {
    /// Open (or create) the gallery directory and load its manifest.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create gallery directory {}", dir.display()))?;

        let mut photos = Vec::new();
        let mut next_id = 0;
        let manifest_path = dir.join(MANIFEST);
        if manifest_path.exists() {
            let raw = fs::read_to_string(&manifest_path)
                .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
            let names: Vec<String> =
                serde_json::from_str(&raw).context("Failed to parse gallery manifest")?;
            for name in names {
                let path = dir.join(&name);
                if path.is_file() {
                    next_id = next_id.max(parse_photo_id(&name).map_or(0, |id| id + 1));
                    photos.push(SavedPhoto { path });
                } else {
                    tracing::warn!("Gallery manifest references missing file {name}");
                }
            }
        }

        tracing::info!(
            "Gallery at {} with {} saved photos",
            dir.display(),
            photos.len()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            photos,
            next_id,
        })
    }

    pub fn photos(&self) -> &[SavedPhoto] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// Encode and record a composite. Returns the new handle.
    pub fn save(&mut self, composite: &RgbaImage) -> Result<SavedPhoto> {
        let name = format!("photo_{:04}.png", self.next_id);
        let path = self.dir.join(&name);
        composite
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        self.next_id += 1;
        let photo = SavedPhoto { path };
        self.photos.push(photo.clone());
        self.write_manifest()?;

        tracing::info!("Saved {}", photo.path.display());
        Ok(photo)
    }

    /// Release every saved photo and truncate the manifest.
    pub fn clear(&mut self) -> Result<()> {
        for photo in self.photos.drain(..) {
            if let Err(e) = fs::remove_file(&photo.path) {
                tracing::warn!("Failed to remove {}: {e}", photo.path.display());
            }
        }
        self.write_manifest()?;
        tracing::info!("Gallery cleared");
        Ok(())
    }

    fn write_manifest(&self) -> Result<()> {
        let names: Vec<String> = self
            .photos
            .iter()
            .filter_map(|photo| {
                photo
                    .path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
            })
            .collect();
        let raw = serde_json::to_string_pretty(&names).context("Failed to encode manifest")?;
        fs::write(self.dir.join(MANIFEST), raw).context("Failed to write gallery manifest")
    }
}

fn parse_photo_id(name: &str) -> Option<u32> {
    name.strip_prefix("photo_")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}
