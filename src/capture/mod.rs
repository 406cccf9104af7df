mod webcam;

pub use webcam::WebcamCapture;

use anyhow::Result;
use image::RgbImage;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// True once the device is streaming. Callers skip the cycle while
    /// this is false rather than compositing stale data.
    fn is_ready(&self) -> bool;

    /// Capture a single frame
    fn grab(&mut self) -> Result<RgbImage>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}
