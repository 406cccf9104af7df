use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use parking_lot::Mutex;

/// Load state of one selectable image.
#[derive(Clone, Default)]
pub enum ImageSlot {
    /// Nothing selected for this role.
    #[default]
    Empty,
    /// A load is in flight.
    Loading,
    Ready(Arc<RgbaImage>),
    /// The decode failed; the selection stays visually inert.
    Failed,
}

impl ImageSlot {
    pub fn ready(&self) -> Option<&Arc<RgbaImage>> {
        match self {
            ImageSlot::Ready(img) => Some(img),
            _ => None,
        }
    }
}

struct SlotCell {
    slot: ImageSlot,
    generation: u64,
}

/// Loads selection images off the UI thread.
///
/// Each `request` bumps a generation counter; a finished load only lands
/// if its generation is still current, so superseding a selection mid-load
/// abandons the stale result (last applied wins). There is no cancellation
/// of the in-flight decode itself, just of its effect.
pub struct AsyncImageLoader {
    cell: Arc<Mutex<SlotCell>>,
}

impl AsyncImageLoader {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Mutex::new(SlotCell {
                slot: ImageSlot::Empty,
                generation: 0,
            })),
        }
    }

    /// Clear the slot (selection set to none).
    pub fn clear(&self) {
        let mut cell = self.cell.lock();
        cell.generation += 1;
        cell.slot = ImageSlot::Empty;
    }

    /// Begin loading `path`, replacing whatever the slot held.
    pub fn request(&self, path: &Path) {
        let generation = {
            let mut cell = self.cell.lock();
            cell.generation += 1;
            cell.slot = ImageSlot::Loading;
            cell.generation
        };

        let cell = Arc::clone(&self.cell);
        let path = path.to_path_buf();
        std::thread::spawn(move || {
            let loaded = image::open(&path);
            let mut cell = cell.lock();
            if cell.generation != generation {
                tracing::debug!("Discarding superseded load of {}", path.display());
                return;
            }
            match loaded {
                Ok(img) => {
                    tracing::debug!("Loaded {}", path.display());
                    cell.slot = ImageSlot::Ready(Arc::new(img.to_rgba8()));
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {e}", path.display());
                    cell.slot = ImageSlot::Failed;
                }
            }
        });
    }

    /// Current slot contents.
    pub fn slot(&self) -> ImageSlot {
        self.cell.lock().slot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn wait_until<F: Fn() -> bool>(predicate: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if predicate() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn scratch_png(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "snapbooth-loader-{}-{name}.png",
            std::process::id()
        ));
        image::RgbaImage::from_pixel(3, 3, image::Rgba([9, 9, 9, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn starts_empty_and_clears_to_empty() {
        let loader = AsyncImageLoader::new();
        assert!(matches!(loader.slot(), ImageSlot::Empty));
        loader.clear();
        assert!(matches!(loader.slot(), ImageSlot::Empty));
    }

    #[test]
    fn load_reaches_ready() {
        let path = scratch_png("ready");
        let loader = AsyncImageLoader::new();
        loader.request(&path);
        assert!(wait_until(|| loader.slot().ready().is_some()));
        let slot = loader.slot();
        let img = slot.ready().unwrap();
        assert_eq!(img.dimensions(), (3, 3));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_reaches_failed() {
        let loader = AsyncImageLoader::new();
        loader.request(Path::new("/definitely/not/here.png"));
        assert!(wait_until(|| matches!(loader.slot(), ImageSlot::Failed)));
    }

    #[test]
    fn superseded_load_does_not_land() {
        let path = scratch_png("superseded");
        let loader = AsyncImageLoader::new();
        loader.request(&path);
        // Clearing before delivery orphans the in-flight load.
        loader.clear();
        std::thread::sleep(Duration::from_millis(100));
        assert!(matches!(loader.slot(), ImageSlot::Empty));
        std::fs::remove_file(&path).unwrap();
    }
}
