use std::path::{Path, PathBuf};

use crate::shared::constants::{DEFAULT_FFMPEG, DEFAULT_FFPROBE};

/// Locations of the external ffmpeg executables.
///
/// Defaults to the bare names, which the OS resolves through `PATH`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl FfmpegTools {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn with_ffmpeg(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg = path.into();
        self
    }

    pub fn with_ffprobe(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe = path.into();
        self
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG, DEFAULT_FFPROBE)
    }
}
