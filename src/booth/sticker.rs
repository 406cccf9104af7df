use std::sync::Arc;

use image::RgbaImage;

/// Side of the square resize handle anchored at a sticker's bottom-right
/// corner, in canvas pixels.
pub const HANDLE_SIZE: f32 = 15.0;

/// Smallest allowed sticker scale.
pub const MIN_SCALE: f32 = 0.05;

/// Scale step applied per wheel notch.
pub const WHEEL_STEP: f32 = 0.05;

/// On-screen width a freshly added sticker starts at.
const INITIAL_WIDTH: f32 = 100.0;

/// One decoration placed on the photo.
///
/// Position is the top-left corner in canvas pixels; the drawn size is the
/// raster size times `scale`.
#[derive(Clone)]
pub struct Sticker {
    pub image: Arc<RgbaImage>,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Sticker {
    /// Place a sticker centered on the canvas at the initial on-screen
    /// width.
    pub fn centered(image: Arc<RgbaImage>, canvas_width: u32, canvas_height: u32) -> Self {
        let scale = INITIAL_WIDTH / image.width() as f32;
        let height = image.height() as f32 * scale;
        Self {
            x: canvas_width as f32 / 2.0 - INITIAL_WIDTH / 2.0,
            y: canvas_height as f32 / 2.0 - height / 2.0,
            scale,
            image,
        }
    }

    pub fn scaled_width(&self) -> f32 {
        self.image.width() as f32 * self.scale
    }

    pub fn scaled_height(&self) -> f32 {
        self.image.height() as f32 * self.scale
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x + self.scaled_width() / 2.0,
            self.y + self.scaled_height() / 2.0,
        )
    }

    /// True when (px, py) falls inside the sticker's scaled bounds.
    pub fn hit_body(&self, px: f32, py: f32) -> bool {
        px > self.x
            && px < self.x + self.scaled_width()
            && py > self.y
            && py < self.y + self.scaled_height()
    }

    /// True when (px, py) falls inside the resize handle at the
    /// bottom-right corner.
    pub fn hit_handle(&self, px: f32, py: f32) -> bool {
        let right = self.x + self.scaled_width();
        let bottom = self.y + self.scaled_height();
        px > right - HANDLE_SIZE && px < right && py > bottom - HANDLE_SIZE && py < bottom
    }

    /// Nudge the scale by `step`, keeping the sticker's center fixed so
    /// the zoom feels anchored.
    pub fn wheel_zoom(&self, step: f32) -> Self {
        let (cx, cy) = self.center();
        let new_scale = (self.scale + step).max(MIN_SCALE);
        let width = self.image.width() as f32 * new_scale;
        let height = self.image.height() as f32 * new_scale;
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            scale: new_scale,
            image: Arc::clone(&self.image),
        }
    }
}

/// What a pointer-down started.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragMode {
    /// Translating the sticker body.
    Move {
        start_x: f32,
        start_y: f32,
        initial_x: f32,
        initial_y: f32,
    },
    /// Dragging the corner handle; horizontal travel controls the scale,
    /// vertical travel is ignored.
    Resize { start_x: f32, initial_scale: f32 },
}

/// Apply a drag update for the current pointer position.
pub fn drag_update(sticker: &Sticker, mode: DragMode, px: f32, py: f32) -> Sticker {
    match mode {
        DragMode::Move {
            start_x,
            start_y,
            initial_x,
            initial_y,
        } => Sticker {
            x: initial_x + (px - start_x),
            y: initial_y + (py - start_y),
            ..sticker.clone()
        },
        DragMode::Resize {
            start_x,
            initial_scale,
        } => {
            let original_width = sticker.image.width() as f32;
            let new_width = original_width * initial_scale + (px - start_x);
            Sticker {
                scale: (new_width / original_width).max(MIN_SCALE),
                ..sticker.clone()
            }
        }
    }
}
