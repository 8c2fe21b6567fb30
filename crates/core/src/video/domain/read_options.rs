use crate::shared::frame_rate::FrameRate;
use crate::shared::resolution::Resolution;
use crate::video::domain::ffmpeg_tools::FfmpegTools;

/// Options for one reader session.
#[derive(Clone, Debug, Default)]
pub struct ReadOptions {
    /// Rescale decoded frames to this size. Rejected for packed 16-bit data.
    pub output_resolution: Option<Resolution>,
    /// Resample to a constant frame rate; implies timestamp-respecting output.
    pub output_fps: Option<FrameRate>,
    /// First frame to decode. Exact only for videos this crate wrote.
    pub start_frame: usize,
    /// Emit frames according to timestamps instead of the raw decoded
    /// stream (duplicates or drops frames for variable frame rate input).
    pub respect_original_timestamps: bool,
    /// Index among the file's video streams.
    pub stream_number: usize,
    pub tools: FfmpegTools,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_resolution(mut self, resolution: Resolution) -> Self {
        self.output_resolution = Some(resolution);
        self
    }

    pub fn with_output_fps(mut self, fps: FrameRate) -> Self {
        self.output_fps = Some(fps);
        self
    }

    pub fn with_start_frame(mut self, start_frame: usize) -> Self {
        self.start_frame = start_frame;
        self
    }

    pub fn with_original_timestamps(mut self, respect: bool) -> Self {
        self.respect_original_timestamps = respect;
        self
    }

    pub fn with_stream_number(mut self, stream_number: usize) -> Self {
        self.stream_number = stream_number;
        self
    }

    pub fn with_tools(mut self, tools: FfmpegTools) -> Self {
        self.tools = tools;
        self
    }

    /// An `fps` filter only works on timestamped output.
    pub fn uses_timestamps(&self) -> bool {
        self.respect_original_timestamps || self.output_fps.is_some()
    }
}
