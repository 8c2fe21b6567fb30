pub const DEFAULT_FFMPEG: &str = "ffmpeg";
pub const DEFAULT_FFPROBE: &str = "ffprobe";

/// Channels per pixel on the raw pipe, for both color and packed depth.
pub const RAW_CHANNELS: usize = 3;

/// Upper bound on ffmpeg stderr kept for error reports.
pub const STDERR_CAPTURE_LIMIT: usize = 64 * 1024;

pub const IMAGE_EXTENSIONS: &[&str] = &["png"];
