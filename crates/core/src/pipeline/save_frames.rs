use std::path::Path;

use ndarray::{ArrayView3, ArrayView4, Axis};

use crate::codec::domain::frame_codec::FrameCodec;
use crate::shared::error::VideoError;
use crate::shared::resolution::Resolution;
use crate::video::domain::encode_config::EncodeConfig;
use crate::video::infrastructure::ffmpeg_writer::{FfmpegWriter, Uint16Writer, VideoWriter};

/// Saves a stack of RGB frames `(n, height, width, 3)` as one video.
pub fn videosave(
    path: impl AsRef<Path>,
    frames: ArrayView4<'_, u8>,
    config: &EncodeConfig,
) -> Result<(), VideoError> {
    let (n, height, width, _) = frames.dim();
    let resolution = stack_resolution(n, height, width)?;
    let writer = VideoWriter::open(path, resolution, config)?;
    write_all(writer, frames.axis_iter(Axis(0)).map(|frame| frame.to_owned()))
}

/// Saves a stack of 16-bit frames `(n, height, width)` as one lossless video.
///
/// Read it back with [`uint16read`](super::read_frames::uint16read).
pub fn uint16save(
    path: impl AsRef<Path>,
    frames: ArrayView3<'_, u16>,
    config: &EncodeConfig,
) -> Result<(), VideoError> {
    let (n, height, width) = frames.dim();
    let resolution = stack_resolution(n, height, width)?;
    let writer = Uint16Writer::open(path, resolution, config)?;
    write_all(writer, frames.axis_iter(Axis(0)).map(|frame| frame.to_owned()))
}

/// Saves 8-bit single-channel frames `(n, height, width)` through the 16-bit
/// path. Each value packs to `[value, 0, 0]`, and
/// [`uint16read`](super::read_frames::uint16read) returns it widened to `u16`.
pub fn uint16save_u8(
    path: impl AsRef<Path>,
    frames: ArrayView3<'_, u8>,
    config: &EncodeConfig,
) -> Result<(), VideoError> {
    uint16save(path, frames.mapv(u16::from).view(), config)
}

fn stack_resolution(n: usize, height: usize, width: usize) -> Result<Resolution, VideoError> {
    if n == 0 {
        return Err(VideoError::config("cannot save an empty frame stack"));
    }
    Resolution::from_shape(height, width)?.validate()
}

fn write_all<C: FrameCodec>(
    mut writer: FfmpegWriter<C>,
    frames: impl Iterator<Item = C::Frame>,
) -> Result<(), VideoError> {
    for frame in frames {
        writer.write(&frame)?;
    }
    writer.close()
}
