use anyhow::{anyhow, Result};
use image::RgbaImage;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

/// One pointer gesture notification, in canvas pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Moved { x: f32, y: f32 },
    Up,
    /// The pointer left the canvas; any drag in progress ends.
    Left,
    /// Wheel movement; positive delta is scroll-up (zoom in).
    Wheel { delta: f32 },
}

/// Native preview window.
///
/// Presents finished composites and folds minifb's polled mouse state into
/// edge-triggered pointer events for the sticker state machine.
pub struct PreviewWindow {
    window: Window,
    width: usize,
    height: usize,
    shown: Vec<u32>,
    mouse_was_down: bool,
    last_pos: Option<(f32, f32)>,
}

impl PreviewWindow {
    pub fn new(title: &str, width: u32, height: u32, fps: u32) -> Result<Self> {
        let mut window = Window::new(
            title,
            width as usize,
            height as usize,
            WindowOptions::default(),
        )
        .map_err(|e| anyhow!("Failed to create preview window: {e}"))?;
        window.set_target_fps(fps as usize);

        Ok(Self {
            window,
            width: width as usize,
            height: height as usize,
            shown: vec![0u32; (width * height) as usize],
            mouse_was_down: false,
            last_pos: None,
        })
    }

    /// False once the user closes the window or hits Escape.
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// Copy a finished composite to the screen in one step.
    pub fn present(&mut self, composite: &RgbaImage) -> Result<()> {
        let width = self.width.min(composite.width() as usize);
        let height = self.height.min(composite.height() as usize);
        for y in 0..height {
            for x in 0..width {
                let px = composite.get_pixel(x as u32, y as u32);
                self.shown[y * self.width + x] =
                    ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32;
            }
        }
        self.window
            .update_with_buffer(&self.shown, self.width, self.height)
            .map_err(|e| anyhow!("Failed to update preview window: {e}"))?;
        Ok(())
    }

    /// Keep the window responsive on cycles that present nothing.
    pub fn pump(&mut self) {
        self.window.update();
    }

    /// Drain pointer activity since the last call.
    pub fn pointer_events(&mut self) -> Vec<PointerEvent> {
        let mut events = Vec::new();
        let pos = self.window.get_mouse_pos(MouseMode::Discard);
        let down = self.window.get_mouse_down(MouseButton::Left);

        match (pos, self.last_pos) {
            (Some((x, y)), previous) => {
                if down && !self.mouse_was_down {
                    events.push(PointerEvent::Down { x, y });
                } else if previous != Some((x, y)) {
                    events.push(PointerEvent::Moved { x, y });
                }
                if !down && self.mouse_was_down {
                    events.push(PointerEvent::Up);
                }
            }
            (None, Some(_)) => events.push(PointerEvent::Left),
            (None, None) => {}
        }

        if let Some((_, scroll_y)) = self.window.get_scroll_wheel() {
            if scroll_y != 0.0 {
                events.push(PointerEvent::Wheel { delta: scroll_y });
            }
        }

        self.mouse_was_down = down && pos.is_some();
        self.last_pos = pos;
        events
    }

    /// Edge-triggered key press.
    pub fn key_pressed(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }
}
