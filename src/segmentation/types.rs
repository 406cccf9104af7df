use anyhow::Result;
use image::RgbImage;

/// Soft alpha matte produced by a segmentation model.
///
/// Values are in [0, 1] where 1.0 means the pixel belongs to the person and
/// 0.0 means background. After postprocessing the matte is pixel-aligned
/// with the frame it was produced from.
#[derive(Clone)]
pub struct Matte {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl Matte {
    /// Matte value at (x, y), clamped to the matte bounds.
    pub fn at(&self, x: u32, y: u32) -> f32 {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        self.data
            .get((y * self.width + x) as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Grayscale rendition of the matte for the debug view.
    pub fn to_gray_rgba(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            let value = (self.at(x, y) * 255.0).clamp(0.0, 255.0) as u8;
            image::Rgba([value, value, value, 255])
        })
    }
}

/// Model quality tier, selecting the network input geometry.
///
/// `General` is the square model; `Landscape` trades vertical resolution
/// for throughput on wide frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelQuality {
    General,
    Landscape,
}

impl ModelQuality {
    /// Network input dimensions (width, height) for this tier.
    pub fn input_size(self) -> (u32, u32) {
        match self {
            ModelQuality::General => (256, 256),
            ModelQuality::Landscape => (256, 144),
        }
    }
}

/// Trait for person-segmentation backends.
///
/// `Send` so a backend can be moved onto the inference worker thread.
pub trait SegmentationModel: Send {
    /// Process a frame and return a matte aligned with it.
    fn segment(&mut self, frame: &RgbImage) -> Result<Matte>;

    /// The model's preferred input dimensions (width, height).
    fn input_size(&self) -> (u32, u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_clamps_to_bounds() {
        let matte = Matte {
            width: 2,
            height: 2,
            data: vec![0.0, 0.25, 0.5, 1.0],
        };
        assert_eq!(matte.at(0, 0), 0.0);
        assert_eq!(matte.at(1, 1), 1.0);
        // Out-of-range coordinates read the nearest edge pixel.
        assert_eq!(matte.at(5, 0), 0.25);
        assert_eq!(matte.at(0, 5), 0.5);
    }

    #[test]
    fn gray_rendition_matches_values() {
        let matte = Matte {
            width: 2,
            height: 1,
            data: vec![0.0, 1.0],
        };
        let gray = matte.to_gray_rgba();
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
        assert_eq!(gray.get_pixel(1, 0)[0], 255);
        assert_eq!(gray.get_pixel(1, 0)[3], 255);
    }

    #[test]
    fn quality_tiers_have_distinct_geometry() {
        assert_eq!(ModelQuality::General.input_size(), (256, 256));
        assert_eq!(ModelQuality::Landscape.input_size(), (256, 144));
    }
}
