mod filter;

pub use filter::PhotoFilter;

use std::sync::Arc;

use image::{imageops, Rgba, RgbaImage, RgbImage};

use crate::booth::{Sticker, HANDLE_SIZE};
use crate::segmentation::Matte;

/// Selection chrome color (outline and resize handle).
const SELECTION_COLOR: Rgba<u8> = Rgba([0, 128, 255, 200]);
const SELECTION_STROKE: u32 = 2;

/// Inputs for one composite pass.
///
/// All images are already resolved and ready; readiness gating happens
/// before a Scene is built.
pub struct Scene<'a> {
    pub frame: &'a RgbImage,
    pub matte: Option<&'a Matte>,
    pub background: Option<&'a RgbaImage>,
    pub overlay: Option<&'a RgbaImage>,
    pub stickers: &'a [Sticker],
    pub active_sticker: Option<usize>,
    pub filter: PhotoFilter,
    /// Draw the active sticker's outline and resize handle. Off for
    /// exports.
    pub show_selection: bool,
}

/// Assembles composites into an owned off-screen buffer.
///
/// The buffer is only handed out as a finished frame; callers copy it to
/// the visible surface in one step so a partially drawn stack is never
/// shown.
pub struct Compositor {
    buffer: RgbaImage,
}

impl Compositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::new(width, height),
        }
    }

    /// Build the layer stack for `scene`.
    ///
    /// Without a background the frame passes through unmodified; with one,
    /// frame pixels are blended over it weighted by the matte. The overlay
    /// and stickers go on top, the filter post-processes everything drawn
    /// so far, and selection chrome (preview only) is drawn last so it
    /// stays legible under every filter.
    pub fn render(&mut self, scene: &Scene) -> &mut RgbaImage {
        let _span = tracing::debug_span!("composite").entered();

        match (scene.background, scene.matte) {
            (Some(background), Some(matte)) => {
                copy_rgba(&mut self.buffer, background);
                blend_matted_frame(&mut self.buffer, scene.frame, matte);
            }
            _ => copy_frame(&mut self.buffer, scene.frame),
        }

        if let Some(overlay) = scene.overlay {
            alpha_over(&mut self.buffer, overlay);
        }

        for sticker in scene.stickers {
            draw_sticker(&mut self.buffer, sticker);
        }

        scene.filter.apply(&mut self.buffer);

        if scene.show_selection {
            if let Some(sticker) = scene
                .active_sticker
                .and_then(|index| scene.stickers.get(index))
            {
                draw_selection(&mut self.buffer, sticker);
            }
        }

        &mut self.buffer
    }
}

/// Caches the canvas-sized rendition of a selection image, re-fitting only
/// when the source changes.
pub struct FittedImage {
    source: Option<Arc<RgbaImage>>,
    fitted: Option<Arc<RgbaImage>>,
}

impl FittedImage {
    pub fn new() -> Self {
        Self {
            source: None,
            fitted: None,
        }
    }

    pub fn fit(
        &mut self,
        source: Option<&Arc<RgbaImage>>,
        width: u32,
        height: u32,
    ) -> Option<Arc<RgbaImage>> {
        let Some(src) = source else {
            self.source = None;
            self.fitted = None;
            return None;
        };
        let current = self
            .source
            .as_ref()
            .is_some_and(|cached| Arc::ptr_eq(cached, src));
        if !current {
            let fitted = if src.dimensions() == (width, height) {
                Arc::clone(src)
            } else {
                Arc::new(imageops::resize(
                    src.as_ref(),
                    width,
                    height,
                    imageops::FilterType::Lanczos3,
                ))
            };
            self.source = Some(Arc::clone(src));
            self.fitted = Some(fitted);
        }
        self.fitted.clone()
    }
}

fn copy_frame(buffer: &mut RgbaImage, frame: &RgbImage) {
    let width = buffer.width().min(frame.width());
    let height = buffer.height().min(frame.height());
    for y in 0..height {
        for x in 0..width {
            let src = frame.get_pixel(x, y);
            buffer.put_pixel(x, y, Rgba([src[0], src[1], src[2], 255]));
        }
    }
}

fn copy_rgba(buffer: &mut RgbaImage, image: &RgbaImage) {
    let width = buffer.width().min(image.width());
    let height = buffer.height().min(image.height());
    for y in 0..height {
        for x in 0..width {
            buffer.put_pixel(x, y, *image.get_pixel(x, y));
        }
    }
}

/// Blend the frame over whatever is in the buffer, weighted by the matte:
/// matte 1.0 shows the frame (the person), matte 0.0 keeps the buffer
/// (the background).
fn blend_matted_frame(buffer: &mut RgbaImage, frame: &RgbImage, matte: &Matte) {
    let width = buffer.width().min(frame.width());
    let height = buffer.height().min(frame.height());
    for y in 0..height {
        for x in 0..width {
            let alpha = matte.at(x, y).clamp(0.0, 1.0);
            if alpha <= 0.0 {
                continue;
            }
            let fg = frame.get_pixel(x, y);
            let px = buffer.get_pixel_mut(x, y);
            for c in 0..3 {
                let blended = fg[c] as f32 * alpha + px[c] as f32 * (1.0 - alpha);
                px[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
            px[3] = 255;
        }
    }
}

/// Standard over-composite of a full-canvas RGBA layer.
fn alpha_over(buffer: &mut RgbaImage, layer: &RgbaImage) {
    let width = buffer.width().min(layer.width());
    let height = buffer.height().min(layer.height());
    for y in 0..height {
        for x in 0..width {
            let src = *layer.get_pixel(x, y);
            blend_pixel(buffer.get_pixel_mut(x, y), src);
        }
    }
}

fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let alpha = src[3] as f32 / 255.0;
    if alpha <= 0.0 {
        return;
    }
    for c in 0..3 {
        let blended = src[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha);
        dst[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    let out_alpha = alpha + (dst[3] as f32 / 255.0) * (1.0 - alpha);
    dst[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Draw a sticker scaled into place. Nearest-neighbour sampling keeps the
/// per-frame cost flat while a drag continuously changes the scale.
fn draw_sticker(buffer: &mut RgbaImage, sticker: &Sticker) {
    let dest_width = sticker.scaled_width().round() as i64;
    let dest_height = sticker.scaled_height().round() as i64;
    if dest_width <= 0 || dest_height <= 0 {
        return;
    }
    let origin_x = sticker.x.round() as i64;
    let origin_y = sticker.y.round() as i64;
    let (src_width, src_height) = sticker.image.dimensions();

    for dy in 0..dest_height {
        let y = origin_y + dy;
        if y < 0 || y >= buffer.height() as i64 {
            continue;
        }
        let sy = ((dy as f32 / dest_height as f32) * src_height as f32) as u32;
        let sy = sy.min(src_height - 1);
        for dx in 0..dest_width {
            let x = origin_x + dx;
            if x < 0 || x >= buffer.width() as i64 {
                continue;
            }
            let sx = ((dx as f32 / dest_width as f32) * src_width as f32) as u32;
            let sx = sx.min(src_width - 1);
            let src = *sticker.image.get_pixel(sx, sy);
            blend_pixel(buffer.get_pixel_mut(x as u32, y as u32), src);
        }
    }
}

/// Outline the active sticker and mark its resize handle.
fn draw_selection(buffer: &mut RgbaImage, sticker: &Sticker) {
    let left = sticker.x.round() as i64;
    let top = sticker.y.round() as i64;
    let right = left + sticker.scaled_width().round() as i64;
    let bottom = top + sticker.scaled_height().round() as i64;

    for t in 0..SELECTION_STROKE as i64 {
        for x in left..right {
            stroke_pixel(buffer, x, top + t);
            stroke_pixel(buffer, x, bottom - 1 - t);
        }
        for y in top..bottom {
            stroke_pixel(buffer, left + t, y);
            stroke_pixel(buffer, right - 1 - t, y);
        }
    }

    let handle = HANDLE_SIZE as i64;
    for y in (bottom - handle).max(top)..bottom {
        for x in (right - handle).max(left)..right {
            stroke_pixel(buffer, x, y);
        }
    }
}

fn stroke_pixel(buffer: &mut RgbaImage, x: i64, y: i64) {
    if x < 0 || y < 0 || x >= buffer.width() as i64 || y >= buffer.height() as i64 {
        return;
    }
    blend_pixel(buffer.get_pixel_mut(x as u32, y as u32), SELECTION_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn plain_scene<'a>(frame: &'a RgbImage) -> Scene<'a> {
        Scene {
            frame,
            matte: None,
            background: None,
            overlay: None,
            stickers: &[],
            active_sticker: None,
            filter: PhotoFilter::None,
            show_selection: false,
        }
    }

    #[test]
    fn no_background_passes_frame_through() {
        let frame = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let mut compositor = Compositor::new(4, 4);
        let out = compositor.render(&plain_scene(&frame));
        for pixel in out.pixels() {
            assert_eq!(pixel.0, [10, 20, 30, 255]);
        }
    }

    #[test]
    fn matte_extremes_pick_frame_or_background() {
        let frame = RgbImage::from_pixel(2, 1, Rgb([200, 0, 0]));
        let background = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 200, 255]));
        // Left pixel background, right pixel person.
        let matte = Matte {
            width: 2,
            height: 1,
            data: vec![0.0, 1.0],
        };
        let mut compositor = Compositor::new(2, 1);
        let mut scene = plain_scene(&frame);
        scene.background = Some(&background);
        scene.matte = Some(&matte);
        let out = compositor.render(&scene);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 200, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [200, 0, 0, 255]);
    }

    #[test]
    fn soft_matte_mixes_frame_into_background() {
        let frame = RgbImage::from_pixel(1, 1, Rgb([255, 255, 255]));
        let background = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let matte = Matte {
            width: 1,
            height: 1,
            data: vec![0.25],
        };
        let mut compositor = Compositor::new(1, 1);
        let mut scene = plain_scene(&frame);
        scene.background = Some(&background);
        scene.matte = Some(&matte);
        let out = compositor.render(&scene);
        let v = out.get_pixel(0, 0)[0];
        assert!((v as i32 - 64).abs() <= 1, "expected ~25% white, got {v}");
    }

    #[test]
    fn background_without_matte_passes_frame_through() {
        // Passthrough mode: a selected background without any delivered
        // matte must not hide the person.
        let frame = RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]));
        let background = RgbaImage::from_pixel(2, 2, Rgba([200, 200, 200, 255]));
        let mut compositor = Compositor::new(2, 2);
        let mut scene = plain_scene(&frame);
        scene.background = Some(&background);
        let out = compositor.render(&scene);
        assert_eq!(out.get_pixel(0, 0).0, [9, 9, 9, 255]);
    }

    #[test]
    fn overlay_respects_its_alpha_channel() {
        let frame = RgbImage::from_pixel(2, 1, Rgb([10, 10, 10]));
        let mut overlay = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        overlay.put_pixel(1, 0, Rgba([250, 0, 0, 255]));
        let mut compositor = Compositor::new(2, 1);
        let mut scene = plain_scene(&frame);
        scene.overlay = Some(&overlay);
        let out = compositor.render(&scene);
        // Transparent overlay pixel leaves the frame visible.
        assert_eq!(out.get_pixel(0, 0).0, [10, 10, 10, 255]);
        // Opaque overlay pixel wins.
        assert_eq!(out.get_pixel(1, 0).0, [250, 0, 0, 255]);
    }

    #[test]
    fn later_stickers_occlude_earlier_ones() {
        let frame = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        let red = Sticker {
            image: Arc::new(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]))),
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        };
        let green = Sticker {
            image: Arc::new(RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255]))),
            x: 2.0,
            y: 2.0,
            scale: 1.0,
        };
        let stickers = vec![red, green];
        let mut compositor = Compositor::new(8, 8);
        let mut scene = plain_scene(&frame);
        scene.stickers = &stickers;
        let out = compositor.render(&scene);
        // Overlap region shows the later sticker.
        assert_eq!(out.get_pixel(3, 3).0, [0, 255, 0, 255]);
        // Non-overlapping part of the first sticker survives.
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn filter_covers_stickers_and_overlay() {
        let frame = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let sticker = Sticker {
            image: Arc::new(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]))),
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        };
        let stickers = vec![sticker];
        let mut compositor = Compositor::new(4, 4);
        let mut scene = plain_scene(&frame);
        scene.stickers = &stickers;
        scene.filter = PhotoFilter::Invert;
        let out = compositor.render(&scene);
        // The sticker pixel went through the invert as well.
        assert_eq!(out.get_pixel(0, 0).0, [245, 235, 225, 255]);
    }

    #[test]
    fn export_scene_has_no_selection_chrome() {
        let frame = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let sticker = Sticker {
            image: Arc::new(RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]))),
            x: 1.0,
            y: 1.0,
            scale: 1.0,
        };
        let stickers = vec![sticker];
        let mut compositor = Compositor::new(8, 8);

        let mut preview = plain_scene(&frame);
        preview.stickers = &stickers;
        preview.active_sticker = Some(0);
        preview.show_selection = true;
        let top_left = compositor.render(&preview).get_pixel(1, 1).0;
        // Chrome was blended over the sticker's corner.
        assert_ne!(top_left, [9, 9, 9, 255]);

        let mut export = plain_scene(&frame);
        export.stickers = &stickers;
        export.active_sticker = Some(0);
        let clean = compositor.render(&export).get_pixel(1, 1).0;
        assert_eq!(clean, [9, 9, 9, 255]);
    }

    #[test]
    fn fitted_image_resizes_once_per_source() {
        let source = Arc::new(RgbaImage::from_pixel(2, 2, Rgba([5, 5, 5, 255])));
        let mut fitted = FittedImage::new();
        let a = fitted.fit(Some(&source), 4, 4).unwrap();
        assert_eq!(a.dimensions(), (4, 4));
        let b = fitted.fit(Some(&source), 4, 4).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(fitted.fit(None, 4, 4).is_none());
    }
}
