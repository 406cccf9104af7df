mod countdown;
mod sticker;

pub use countdown::{Countdown, CountdownEvent, TimerDelay};
pub use sticker::{drag_update, DragMode, Sticker, HANDLE_SIZE, MIN_SCALE, WHEEL_STEP};

use std::sync::Arc;

use image::RgbaImage;

use crate::assets::ImageSlot;
use crate::compose::PhotoFilter;

/// Index into the asset catalog, or nothing selected.
pub type Selection = Option<usize>;

/// Everything the user can change about the picture being built.
///
/// Updates replace the whole value rather than mutating fields in place,
/// which keeps the sticker-list/selection invariants in one spot and makes
/// the interaction handlers pure enough to unit test.
#[derive(Clone, Default)]
pub struct EditorState {
    pub background: Selection,
    pub overlay: Selection,
    pub filter: PhotoFilter,
    pub stickers: Vec<Sticker>,
    pub active_sticker: Option<usize>,
    pub drag: Option<DragMode>,
}

impl EditorState {
    pub fn with_background(&self, selection: Selection) -> Self {
        Self {
            background: selection,
            ..self.clone()
        }
    }

    pub fn with_overlay(&self, selection: Selection) -> Self {
        Self {
            overlay: selection,
            ..self.clone()
        }
    }

    pub fn with_filter(&self, filter: PhotoFilter) -> Self {
        Self {
            filter,
            ..self.clone()
        }
    }

    /// Pointer pressed at (px, py): topmost sticker wins, its corner
    /// handle beats its body, and empty space clears the selection.
    pub fn pointer_down(&self, px: f32, py: f32) -> Self {
        let mut next = self.clone();
        for i in (0..self.stickers.len()).rev() {
            let sticker = &self.stickers[i];
            if sticker.hit_handle(px, py) {
                next.active_sticker = Some(i);
                next.drag = Some(DragMode::Resize {
                    start_x: px,
                    initial_scale: sticker.scale,
                });
                return next;
            }
            if sticker.hit_body(px, py) {
                next.active_sticker = Some(i);
                next.drag = Some(DragMode::Move {
                    start_x: px,
                    start_y: py,
                    initial_x: sticker.x,
                    initial_y: sticker.y,
                });
                return next;
            }
        }
        next.active_sticker = None;
        next.drag = None;
        next
    }

    /// Pointer moved; only meaningful mid-drag.
    pub fn pointer_move(&self, px: f32, py: f32) -> Self {
        let (Some(index), Some(mode)) = (self.active_sticker, self.drag) else {
            return self.clone();
        };
        let Some(sticker) = self.stickers.get(index) else {
            return self.clone();
        };
        let mut next = self.clone();
        next.stickers[index] = sticker::drag_update(sticker, mode, px, py);
        next
    }

    /// Pointer released or left the canvas: the drag ends, geometry stays.
    pub fn pointer_up(&self) -> Self {
        Self {
            drag: None,
            ..self.clone()
        }
    }

    /// Wheel movement over the canvas scales the active sticker; positive
    /// delta zooms in.
    pub fn wheel(&self, delta: f32) -> Self {
        let Some(index) = self.active_sticker else {
            return self.clone();
        };
        let Some(sticker) = self.stickers.get(index) else {
            return self.clone();
        };
        let step = if delta > 0.0 { WHEEL_STEP } else { -WHEEL_STEP };
        let mut next = self.clone();
        next.stickers[index] = sticker.wheel_zoom(step);
        next
    }

    /// Append a sticker and make it the active one.
    pub fn add_sticker(
        &self,
        image: Arc<RgbaImage>,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Self {
        let mut next = self.clone();
        next.stickers
            .push(Sticker::centered(image, canvas_width, canvas_height));
        next.active_sticker = Some(next.stickers.len() - 1);
        next.drag = None;
        next
    }

    /// Cycle a selection through `len` catalog entries and back to none.
    pub fn cycle_selection(selection: Selection, len: usize) -> Selection {
        match selection {
            None if len > 0 => Some(0),
            None => None,
            Some(i) if i + 1 < len => Some(i + 1),
            Some(_) => None,
        }
    }

    /// Full reset: drops every sticker, selection and filter.
    pub fn reset(&self) -> Self {
        Self::default()
    }
}

/// Drawing gate: a cycle may only composite when every image the state
/// references has finished loading. Otherwise the cycle is skipped and
/// whatever was last presented stays on screen.
pub fn scene_ready(state: &EditorState, background: &ImageSlot, overlay: &ImageSlot) -> bool {
    if state.background.is_some() && background.ready().is_none() {
        return false;
    }
    if state.overlay.is_some() && overlay.ready().is_none() {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width: u32, height: u32) -> Arc<RgbaImage> {
        Arc::new(RgbaImage::new(width, height))
    }

    fn state_with_two_stickers() -> EditorState {
        // Both stickers cover (60, 60); the second was added later so it
        // sits on top.
        let state = EditorState::default()
            .add_sticker(raster(100, 100), 640, 480)
            .add_sticker(raster(100, 100), 640, 480);
        assert_eq!(state.active_sticker, Some(1));
        state
    }

    #[test]
    fn pointer_down_prefers_topmost_sticker() {
        let state = state_with_two_stickers();
        let (cx, cy) = state.stickers[1].center();
        let next = state.pointer_down(cx, cy);
        assert_eq!(next.active_sticker, Some(1));
        assert!(matches!(next.drag, Some(DragMode::Move { .. })));
    }

    #[test]
    fn pointer_down_on_handle_starts_resize() {
        let state = state_with_two_stickers();
        let sticker = &state.stickers[1];
        let px = sticker.x + sticker.scaled_width() - 2.0;
        let py = sticker.y + sticker.scaled_height() - 2.0;
        let next = state.pointer_down(px, py);
        assert!(matches!(next.drag, Some(DragMode::Resize { .. })));
    }

    #[test]
    fn pointer_down_on_empty_space_clears_selection() {
        let state = state_with_two_stickers();
        let next = state.pointer_down(1.0, 1.0);
        assert_eq!(next.active_sticker, None);
        assert_eq!(next.drag, None);
        // The stickers themselves survive.
        assert_eq!(next.stickers.len(), 2);
    }

    #[test]
    fn drag_then_release_keeps_geometry() {
        let state = state_with_two_stickers();
        let (cx, cy) = state.stickers[1].center();
        let dragging = state.pointer_down(cx, cy).pointer_move(cx + 10.0, cy + 5.0);
        let released = dragging.pointer_up();
        assert_eq!(released.drag, None);
        assert_eq!(released.stickers[1].x, dragging.stickers[1].x);
        assert_eq!(released.stickers[1].y, dragging.stickers[1].y);
        // Moves after release are ignored.
        let after = released.pointer_move(0.0, 0.0);
        assert_eq!(after.stickers[1].x, released.stickers[1].x);
    }

    #[test]
    fn wheel_without_active_sticker_is_inert() {
        let state = state_with_two_stickers().pointer_down(1.0, 1.0);
        let next = state.wheel(1.0);
        assert_eq!(next.stickers[0].scale, state.stickers[0].scale);
        assert_eq!(next.stickers[1].scale, state.stickers[1].scale);
    }

    #[test]
    fn wheel_scales_only_the_active_sticker() {
        let state = state_with_two_stickers();
        let next = state.wheel(1.0);
        assert!(next.stickers[1].scale > state.stickers[1].scale);
        assert_eq!(next.stickers[0].scale, state.stickers[0].scale);
    }

    #[test]
    fn selection_cycle_walks_catalog_then_none() {
        assert_eq!(EditorState::cycle_selection(None, 2), Some(0));
        assert_eq!(EditorState::cycle_selection(Some(0), 2), Some(1));
        assert_eq!(EditorState::cycle_selection(Some(1), 2), None);
        assert_eq!(EditorState::cycle_selection(None, 0), None);
    }

    #[test]
    fn reset_clears_everything() {
        let state = state_with_two_stickers()
            .with_filter(PhotoFilter::Sepia)
            .with_background(Some(1));
        let fresh = state.reset();
        assert!(fresh.stickers.is_empty());
        assert_eq!(fresh.active_sticker, None);
        assert_eq!(fresh.background, None);
        assert_eq!(fresh.filter, PhotoFilter::None);
    }

    #[test]
    fn gating_blocks_until_referenced_images_are_ready() {
        let state = EditorState::default().with_background(Some(0));
        assert!(!scene_ready(&state, &ImageSlot::Loading, &ImageSlot::Empty));
        assert!(!scene_ready(&state, &ImageSlot::Failed, &ImageSlot::Empty));
        let ready = ImageSlot::Ready(raster(4, 4));
        assert!(scene_ready(&state, &ready, &ImageSlot::Empty));

        // No selection: nothing to wait for.
        let plain = EditorState::default();
        assert!(scene_ready(&plain, &ImageSlot::Empty, &ImageSlot::Empty));
    }
}
