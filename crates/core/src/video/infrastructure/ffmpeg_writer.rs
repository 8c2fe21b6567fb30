use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ChildStdin;
use std::time::Duration;

use crate::codec::domain::frame_codec::FrameCodec;
use crate::codec::infrastructure::rgb_codec::RgbCodec;
use crate::codec::infrastructure::uint16_codec::Uint16Codec;
use crate::shared::error::VideoError;
use crate::shared::resolution::Resolution;
use crate::video::domain::encode_config::EncodeConfig;
use crate::video::infrastructure::ffmpeg_process::{FfmpegProcess, Pipe};

/// Writes RGB frames as H.264.
pub type VideoWriter = FfmpegWriter<RgbCodec>;

/// Writes 16-bit single-channel frames as lossless H.264.
pub type Uint16Writer = FfmpegWriter<Uint16Codec>;

/// Streams raw frames into one ffmpeg encoding process.
///
/// Frames are validated against the session resolution before anything
/// reaches the pipe, so a rejected frame leaves the session usable.
/// Dropping an unclosed writer finalizes the video the same way
/// [`close`](Self::close) does and logs any failure.
///
/// ```no_run
/// use ndarray::Array3;
/// use videoio_core::{EncodeConfig, Resolution, VideoWriter};
///
/// let mut writer = VideoWriter::open("out.mp4", Resolution::new(64, 48), &EncodeConfig::new())?;
/// writer.write(&Array3::zeros((48, 64, 3)))?;
/// writer.close()?;
/// # Ok::<(), videoio_core::VideoError>(())
/// ```
pub struct FfmpegWriter<C: FrameCodec = RgbCodec> {
    codec: C,
    path: PathBuf,
    target: PathBuf,
    resolution: Resolution,
    close_timeout: Option<Duration>,
    process: Option<FfmpegProcess>,
    stdin: Option<ChildStdin>,
    buffer: Vec<u8>,
    frames_written: usize,
}

impl<C: FrameCodec + Default> FfmpegWriter<C> {
    pub fn open(
        path: impl AsRef<Path>,
        resolution: Resolution,
        config: &EncodeConfig,
    ) -> Result<Self, VideoError> {
        Self::with_codec(C::default(), path, resolution, config)
    }
}

impl<C: FrameCodec> FfmpegWriter<C> {
    pub fn with_codec(
        codec: C,
        path: impl AsRef<Path>,
        resolution: Resolution,
        config: &EncodeConfig,
    ) -> Result<Self, VideoError> {
        let path = path.as_ref().to_path_buf();
        let resolution = resolution.validate()?;
        let lossless = config.resolve_lossless(&codec)?;
        let target = if config.atomic {
            partial_path(&path)?
        } else {
            path.clone()
        };

        let args = encode_args(&codec, resolution, config, lossless, &target);
        let mut process = FfmpegProcess::spawn(config.tools.ffmpeg(), &args, Pipe::Stdin)?;
        let stdin = process
            .take_stdin()
            .ok_or_else(|| VideoError::process("failed to capture ffmpeg stdin", ""))?;

        log::info!(
            "writing {} video {} ({resolution}, preset={}, lossless={lossless})",
            codec.name(),
            path.display(),
            config.preset
        );

        let frame_size = codec.frame_size(resolution);
        Ok(Self {
            codec,
            path,
            target,
            resolution,
            close_timeout: config.close_timeout,
            process: Some(process),
            stdin: Some(stdin),
            buffer: vec![0; frame_size],
            frames_written: 0,
        })
    }

    /// Encodes one frame and hands it to ffmpeg.
    pub fn write(&mut self, frame: &C::Frame) -> Result<(), VideoError> {
        if self.process.is_none() {
            return Err(VideoError::SessionClosed);
        }
        let actual = self.codec.frame_resolution(frame)?;
        if actual != self.resolution {
            return Err(VideoError::shape_mismatch(self.resolution, actual));
        }

        self.codec.encode_into(frame, &mut self.buffer);
        let stdin = self.stdin.as_mut().ok_or(VideoError::SessionClosed)?;
        if let Err(e) = stdin.write_all(&self.buffer) {
            return Err(self.abort(&format!(
                "ffmpeg stopped accepting frames after {} frames: {e}",
                self.frames_written
            )));
        }
        self.frames_written += 1;
        Ok(())
    }

    /// Signals end of input and waits for ffmpeg to finish the file.
    pub fn close(&mut self) -> Result<(), VideoError> {
        if self.process.is_none() {
            return Err(VideoError::SessionClosed);
        }
        self.finish()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn is_closed(&self) -> bool {
        self.process.is_none()
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        // EOF on stdin tells ffmpeg to flush and write the trailer.
        drop(self.stdin.take());
        let Some(mut process) = self.process.take() else {
            return Ok(());
        };
        let result = process.finish(self.close_timeout);
        let result = result.and_then(|()| self.commit());
        match &result {
            Ok(()) => log::info!(
                "wrote {} frames to {}",
                self.frames_written,
                self.path.display()
            ),
            Err(_) => self.discard_partial(),
        }
        result
    }

    fn abort(&mut self, message: &str) -> VideoError {
        drop(self.stdin.take());
        let stderr = self
            .process
            .take()
            .map(|mut process| process.kill())
            .unwrap_or_default();
        self.discard_partial();
        VideoError::process(message, stderr)
    }

    fn commit(&self) -> Result<(), VideoError> {
        if self.target != self.path {
            fs::rename(&self.target, &self.path)?;
        }
        Ok(())
    }

    fn discard_partial(&self) {
        if self.target != self.path && self.target.exists() {
            if let Err(e) = fs::remove_file(&self.target) {
                log::warn!("failed to remove {}: {e}", self.target.display());
            }
        }
    }
}

impl<C: FrameCodec> Drop for FfmpegWriter<C> {
    fn drop(&mut self) {
        if self.process.is_some() {
            if let Err(e) = self.finish() {
                log::warn!("closing {} failed: {e}", self.path.display());
            }
        }
    }
}

fn encode_args<C: FrameCodec>(
    codec: &C,
    resolution: Resolution,
    config: &EncodeConfig,
    lossless: bool,
    output: &Path,
) -> Vec<OsString> {
    let encoding = codec.encoding(lossless);
    let mut args = Vec::new();
    push(&mut args, &["-hide_banner", "-loglevel", "error", "-y"]);
    push(
        &mut args,
        &[
            "-f",
            "rawvideo",
            "-pix_fmt",
            codec.raw_pixel_format(),
            "-s",
            &resolution.to_string(),
        ],
    );
    if let Some(fps) = config.fps {
        push(&mut args, &["-framerate", &fps.to_string()]);
    }
    push(&mut args, &["-i", "pipe:0"]);
    push(
        &mut args,
        &["-c:v", encoding.encoder, "-preset", config.preset.as_str()],
    );
    if let Some(profile) = encoding.profile {
        push(&mut args, &["-profile:v", profile]);
    }
    if let Some(qp) = encoding.qp {
        push(&mut args, &["-qp", &qp.to_string()]);
    }
    push(&mut args, &["-pix_fmt", encoding.pixel_format]);
    args.push(output.as_os_str().to_os_string());
    args
}

fn push(args: &mut Vec<OsString>, items: &[&str]) {
    args.extend(items.iter().map(OsString::from));
}

/// Hidden sibling of `path` that keeps its extension, so ffmpeg still picks
/// the right container.
fn partial_path(path: &Path) -> Result<PathBuf, VideoError> {
    let stem = path
        .file_stem()
        .ok_or_else(|| VideoError::config(format!("invalid output path {}", path.display())))?;
    let mut name = OsString::from(".");
    name.push(stem);
    name.push(".partial");
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    Ok(path.with_file_name(name))
}
