mod preprocess;
mod selfie;
pub mod types;
mod worker;

pub use selfie::SelfieSegmenter;
pub use types::{Matte, ModelQuality, SegmentationModel};
pub use worker::SegmentationWorker;

use anyhow::Result;
use std::path::Path;

/// Create the default segmentation backend for a model file.
pub fn create_model<P: AsRef<Path>>(
    model_path: P,
    quality: ModelQuality,
) -> Result<Box<dyn SegmentationModel>> {
    let model = SelfieSegmenter::new(model_path, quality)?;
    Ok(Box::new(model))
}
