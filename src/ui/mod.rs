mod hud;
mod window;

pub use hud::draw_countdown;
pub use window::{PointerEvent, PreviewWindow};
