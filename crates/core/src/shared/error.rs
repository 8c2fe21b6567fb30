use std::path::PathBuf;

use thiserror::Error;

use crate::shared::resolution::Resolution;

/// Errors surfaced by reader and writer sessions.
///
/// Nothing is retried; the only local recovery is process cleanup.
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("frame shape {actual} does not match session resolution {expected}")]
    FrameShape {
        expected: String,
        actual: String,
    },
    #[error("session is already closed")]
    SessionClosed,
    #[error("{message}{}", format_stderr(.stderr))]
    CodecProcess { message: String, stderr: String },
    #[error("cannot read video {path}: {reason}")]
    FileFormat { path: PathBuf, reason: String },
    #[error("executable not found: {tool} (is ffmpeg installed and on PATH?)")]
    ToolNotFound { tool: PathBuf },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VideoError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn shape_mismatch(expected: Resolution, actual: impl std::fmt::Display) -> Self {
        Self::FrameShape {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn process(message: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CodecProcess {
            message: message.into(),
            stderr: stderr.into(),
        }
    }

    pub(crate) fn file_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_process_message_includes_stderr() {
        let err = VideoError::process("ffmpeg exited with status 1", "Unknown encoder 'x'\n");
        assert_eq!(
            err.to_string(),
            "ffmpeg exited with status 1: Unknown encoder 'x'"
        );
    }

    #[test]
    fn test_codec_process_message_without_stderr() {
        let err = VideoError::process("ffmpeg exited with status 1", "  \n");
        assert_eq!(err.to_string(), "ffmpeg exited with status 1");
    }

    #[test]
    fn test_shape_mismatch_formats_both_shapes() {
        let err = VideoError::shape_mismatch(Resolution::new(4, 2), "3x2");
        assert_eq!(
            err.to_string(),
            "frame shape 3x2 does not match session resolution 4x2"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: VideoError = io.into();
        assert!(matches!(err, VideoError::Io(_)));
    }
}
