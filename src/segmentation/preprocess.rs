use anyhow::Result;
use image::{imageops, RgbImage};
use ndarray::Array4;

use super::types::Matte;

/// Converts camera frames into network input tensors and network output
/// logits back into frame-aligned mattes.
pub struct Preprocessor {
    net_width: u32,
    net_height: u32,
}

impl Preprocessor {
    pub fn new(net_width: u32, net_height: u32) -> Self {
        Self {
            net_width,
            net_height,
        }
    }

    /// Resize a frame to the network geometry and tensorise it as NCHW
    /// float in [0, 1].
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn frame_to_tensor(&self, frame: &RgbImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized = if frame.dimensions() != (self.net_width, self.net_height) {
            imageops::resize(
                frame,
                self.net_width,
                self.net_height,
                imageops::FilterType::Triangle,
            )
        } else {
            frame.clone()
        };

        let (width, height) = resized.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
            tensor[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
            tensor[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
        }
        tensor
    }

    /// Turn raw network logits into a matte resized to the frame geometry.
    ///
    /// The selfie model emits one foreground logit per network pixel;
    /// sigmoid maps them to [0, 1] before the bilinear resize back up to
    /// frame resolution.
    pub fn logits_to_matte(
        &self,
        logits: &[f32],
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Matte> {
        let _span = tracing::debug_span!("postprocess").entered();

        anyhow::ensure!(
            logits.len() == (self.net_width * self.net_height) as usize,
            "logit count {} does not match network geometry {}x{}",
            logits.len(),
            self.net_width,
            self.net_height
        );

        let gray = image::GrayImage::from_fn(self.net_width, self.net_height, |x, y| {
            let idx = (y * self.net_width + x) as usize;
            let alpha = sigmoid(logits[idx]);
            image::Luma([(alpha * 255.0).round() as u8])
        });

        let resized = if (self.net_width, self.net_height) == (frame_width, frame_height) {
            gray
        } else {
            imageops::resize(
                &gray,
                frame_width,
                frame_height,
                imageops::FilterType::Triangle,
            )
        };

        let data = resized.pixels().map(|p| p[0] as f32 / 255.0).collect();
        Ok(Matte {
            width: frame_width,
            height: frame_height,
            data,
        })
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
