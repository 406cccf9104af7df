use anyhow::{Context, Result};
use image::RgbImage;
use ort::{GraphOptimizationLevel, Session};
use std::path::Path;

use super::preprocess::Preprocessor;
use super::types::{Matte, ModelQuality, SegmentationModel};

/// Selfie-segmentation model running on ONNX Runtime.
///
/// Stateless per frame: one input tensor in, one per-pixel foreground
/// logit map out.
pub struct SelfieSegmenter {
    session: Session,
    preprocessor: Preprocessor,
    net_width: u32,
    net_height: u32,
}

impl SelfieSegmenter {
    /// Load the model from an ONNX file at the given quality tier.
    pub fn new<P: AsRef<Path>>(model_path: P, quality: ModelQuality) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading segmentation model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let (net_width, net_height) = quality.input_size();
        tracing::info!(
            "Segmentation model loaded, network input {}x{}",
            net_width,
            net_height
        );

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(net_width, net_height),
            net_width,
            net_height,
        })
    }
}

impl SegmentationModel for SelfieSegmenter {
    fn segment(&mut self, frame: &RgbImage) -> Result<Matte> {
        let _span = tracing::debug_span!("selfie_segment").entered();

        let input = self.preprocessor.frame_to_tensor(frame);

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input.view()]?)
            .context("Failed to run inference")?;
        drop(_infer_span);

        // Single output: foreground logits, shape [1, 1, H, W].
        let logits = outputs[0].try_extract_tensor::<f32>()?.view().to_owned();
        let flat: Vec<f32> = logits.iter().copied().collect();

        let (frame_width, frame_height) = frame.dimensions();
        self.preprocessor
            .logits_to_matte(&flat, frame_width, frame_height)
    }

    fn input_size(&self) -> (u32, u32) {
        (self.net_width, self.net_height)
    }
}
