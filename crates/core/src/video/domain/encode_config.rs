use std::time::Duration;

use crate::codec::domain::frame_codec::FrameCodec;
use crate::shared::error::VideoError;
use crate::shared::frame_rate::FrameRate;
use crate::shared::preset::Preset;
use crate::video::domain::ffmpeg_tools::FfmpegTools;

/// Compression settings for one writer session.
#[derive(Clone, Debug, Default)]
pub struct EncodeConfig {
    /// `None` picks the codec's default: lossy for color, lossless for
    /// packed 16-bit data.
    pub lossless: Option<bool>,
    pub preset: Preset,
    /// `None` leaves ffmpeg's default input rate (25 fps).
    pub fps: Option<FrameRate>,
    /// Upper bound on the final wait for ffmpeg; the process is killed
    /// when it expires.
    pub close_timeout: Option<Duration>,
    /// Encode into a hidden sibling file and rename it into place only
    /// after ffmpeg exits successfully.
    pub atomic: bool,
    pub tools: FfmpegTools,
}

impl EncodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lossless(mut self, lossless: bool) -> Self {
        self.lossless = Some(lossless);
        self
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_fps(mut self, fps: FrameRate) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = Some(timeout);
        self
    }

    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn with_tools(mut self, tools: FfmpegTools) -> Self {
        self.tools = tools;
        self
    }

    /// Whether `codec` should be coded losslessly under this config.
    pub fn resolve_lossless<C: FrameCodec>(&self, codec: &C) -> Result<bool, VideoError> {
        match self.lossless {
            Some(false) if codec.requires_lossless() => Err(VideoError::config(format!(
                "{} frames must be encoded losslessly",
                codec.name()
            ))),
            Some(lossless) => Ok(lossless),
            None => Ok(codec.requires_lossless()),
        }
    }
}
