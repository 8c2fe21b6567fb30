use std::ffi::OsString;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::ChildStdout;

use crate::codec::domain::frame_codec::FrameCodec;
use crate::codec::infrastructure::rgb_codec::RgbCodec;
use crate::codec::infrastructure::uint16_codec::Uint16Codec;
use crate::shared::error::VideoError;
use crate::shared::frame_rate::FrameRate;
use crate::shared::resolution::Resolution;
use crate::shared::video_metadata::VideoParams;
use crate::video::domain::read_options::ReadOptions;
use crate::video::infrastructure::ffmpeg_process::{FfmpegProcess, Pipe};
use crate::video::infrastructure::ffprobe::read_video_params;

/// Reads RGB frames from any video ffmpeg can decode.
pub type VideoReader = FfmpegReader<RgbCodec>;

/// Reads 16-bit frames written by [`Uint16Writer`](super::ffmpeg_writer::Uint16Writer).
pub type Uint16Reader = FfmpegReader<Uint16Codec>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Streaming,
    /// End of stream was reported once; further reads are rejected.
    Exhausted,
    Closed,
}

/// Decodes a video one frame at a time through an ffmpeg child process.
///
/// The reader is a single-pass iterator: once exhausted or closed it stays
/// that way, and reading the video again takes a new reader. Dropping it
/// early kills the decoder.
pub struct FfmpegReader<C: FrameCodec = RgbCodec> {
    codec: C,
    path: PathBuf,
    params: VideoParams,
    resolution: Resolution,
    fps: Option<FrameRate>,
    start_frame: usize,
    process: Option<FfmpegProcess>,
    stdout: Option<ChildStdout>,
    buffer: Vec<u8>,
    frames_read: usize,
    state: State,
}

impl<C: FrameCodec + Default> FfmpegReader<C> {
    pub fn open(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Self, VideoError> {
        Self::with_codec(C::default(), path, options)
    }
}

impl<C: FrameCodec> FfmpegReader<C> {
    pub fn with_codec(
        codec: C,
        path: impl AsRef<Path>,
        options: &ReadOptions,
    ) -> Result<Self, VideoError> {
        let path = path.as_ref().to_path_buf();
        let params = read_video_params(&path, options.stream_number, &options.tools)?;
        codec
            .check_source(&params)
            .map_err(|reason| VideoError::file_format(&path, reason))?;

        let resolution = match options.output_resolution {
            Some(requested) => {
                let requested = requested.validate()?;
                if requested != params.resolution() && !codec.supports_rescale() {
                    return Err(VideoError::config(format!(
                        "{} frames cannot be resampled from {} to {requested}",
                        codec.name(),
                        params.resolution()
                    )));
                }
                requested
            }
            None => params.resolution(),
        };
        let fps = options.output_fps.or(params.fps);

        let args = decode_args(&codec, &path, &params, resolution, fps, options)?;
        let mut process = FfmpegProcess::spawn(options.tools.ffmpeg(), &args, Pipe::Stdout)?;
        let stdout = process
            .take_stdout()
            .ok_or_else(|| VideoError::process("failed to capture ffmpeg stdout", ""))?;

        log::info!(
            "reading {} video {} ({} -> {resolution}, {} frames)",
            codec.name(),
            path.display(),
            params.resolution(),
            params
                .length
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        let frame_size = codec.frame_size(resolution);
        Ok(Self {
            codec,
            path,
            params,
            resolution,
            fps,
            start_frame: options.start_frame,
            process: Some(process),
            stdout: Some(stdout),
            buffer: vec![0; frame_size],
            frames_read: 0,
            state: State::Streaming,
        })
    }

    /// Decodes the next frame, `Ok(None)` at the end of the video.
    ///
    /// Reading past the end, or after [`close`](Self::close), is a
    /// [`VideoError::SessionClosed`].
    pub fn next_frame(&mut self) -> Result<Option<C::Frame>, VideoError> {
        match self.state {
            State::Streaming => {}
            State::Exhausted | State::Closed => return Err(VideoError::SessionClosed),
        }

        match self.fill_buffer() {
            Ok(true) => {
                let frame = self.codec.decode(&self.buffer, self.resolution)?;
                self.frames_read += 1;
                Ok(Some(frame))
            }
            Ok(false) => {
                self.state = State::Exhausted;
                self.stdout = None;
                if let Some(mut process) = self.process.take() {
                    process.finish(None)?;
                }
                log::info!("read {} frames from {}", self.frames_read, self.path.display());
                Ok(None)
            }
            Err(err) => {
                self.state = State::Exhausted;
                Err(err)
            }
        }
    }

    /// Stops decoding and reaps the ffmpeg process.
    pub fn close(&mut self) {
        self.stdout = None;
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
        self.state = State::Closed;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parameters of the source stream.
    pub fn params(&self) -> &VideoParams {
        &self.params
    }

    /// Resolution of the frames this reader yields.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Output frame rate: the requested one, else the source average.
    pub fn fps(&self) -> Option<FrameRate> {
        self.fps
    }

    /// Frames left after `start_frame`, when the container reports a length.
    pub fn len_hint(&self) -> Option<usize> {
        self.params
            .length
            .map(|length| length.saturating_sub(self.start_frame))
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// PID of the decoder while it is running.
    pub fn process_id(&self) -> Option<u32> {
        self.process.as_ref().map(FfmpegProcess::id)
    }

    /// Reads exactly one frame. `Ok(false)` on a clean end of stream.
    fn fill_buffer(&mut self) -> Result<bool, VideoError> {
        let stdout = self.stdout.as_mut().ok_or(VideoError::SessionClosed)?;
        let mut filled = 0;
        while filled < self.buffer.len() {
            match stdout.read(&mut self.buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail(&format!("reading decoded frames failed: {e}"))),
            }
        }

        if filled == 0 {
            Ok(false)
        } else if filled < self.buffer.len() {
            Err(self.fail(&format!(
                "ffmpeg output ended mid-frame ({filled} of {} bytes) after {} frames",
                self.buffer.len(),
                self.frames_read
            )))
        } else {
            Ok(true)
        }
    }

    fn fail(&mut self, message: &str) -> VideoError {
        self.stdout = None;
        let stderr = self
            .process
            .take()
            .map(|mut process| process.kill())
            .unwrap_or_default();
        VideoError::process(message, stderr)
    }
}

impl<C: FrameCodec> Iterator for FfmpegReader<C> {
    type Item = Result<C::Frame, VideoError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) | Err(VideoError::SessionClosed) => None,
            Err(err) => Some(Err(err)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.state != State::Streaming {
            return (0, Some(0));
        }
        (0, None)
    }
}

impl<C: FrameCodec> std::iter::FusedIterator for FfmpegReader<C> {}

impl<C: FrameCodec> Drop for FfmpegReader<C> {
    fn drop(&mut self) {
        if self.process.is_some() {
            log::debug!(
                "reader for {} dropped after {} frames",
                self.path.display(),
                self.frames_read
            );
            self.close();
        }
    }
}

fn decode_args<C: FrameCodec>(
    codec: &C,
    path: &Path,
    params: &VideoParams,
    resolution: Resolution,
    fps: Option<FrameRate>,
    options: &ReadOptions,
) -> Result<Vec<OsString>, VideoError> {
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-nostdin"]
        .into_iter()
        .map(OsString::from)
        .collect();

    if options.start_frame > 0 {
        let fps = fps.ok_or_else(|| {
            VideoError::config("cannot seek to a start frame without a known frame rate")
        })?;
        // Half a frame early so rounding never skips the requested frame.
        let seconds = (options.start_frame as f64 - 0.5) / fps.as_f64();
        args.push("-ss".into());
        args.push(format!("{seconds:.6}").into());
    }

    args.push("-i".into());
    args.push(path.as_os_str().to_os_string());
    args.push("-map".into());
    args.push(format!("0:v:{}", options.stream_number).into());

    let mut filters = Vec::new();
    if resolution != params.resolution() {
        filters.push(format!("scale={}:{}", resolution.width, resolution.height));
    }
    if let Some(output_fps) = options.output_fps {
        filters.push(format!("fps={output_fps}"));
    }
    if !filters.is_empty() {
        args.push("-vf".into());
        args.push(filters.join(",").into());
    }

    for arg in ["-f", "rawvideo", "-pix_fmt", codec.raw_pixel_format()] {
        args.push(arg.into());
    }
    if !options.uses_timestamps() {
        args.push("-vsync".into());
        args.push("0".into());
    }
    args.push("pipe:1".into());
    Ok(args)
}
