use serde::Serialize;

use crate::shared::frame_rate::FrameRate;
use crate::shared::resolution::Resolution;

/// Stream parameters reported by the probe step.
///
/// `width`/`height` are display dimensions: for streams rotated by 90 or
/// 270 degrees they are already swapped.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    /// Average frame rate; `None` when the container does not report one.
    pub fps: Option<FrameRate>,
    /// Frame count; `None` when the container does not store it.
    pub length: Option<usize>,
    pub codec: String,
    pub pixel_format: String,
    pub rotation: i32,
}

impl VideoParams {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}
