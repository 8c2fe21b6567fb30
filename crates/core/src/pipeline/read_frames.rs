use std::path::Path;

use ndarray::{Array3, Array4};

use crate::codec::domain::frame_codec::FrameCodec;
use crate::shared::constants::RAW_CHANNELS;
use crate::shared::error::VideoError;
use crate::shared::video_metadata::VideoParams;
use crate::video::domain::read_options::ReadOptions;
use crate::video::infrastructure::ffmpeg_reader::{FfmpegReader, Uint16Reader, VideoReader};

/// Decodes a whole video into `(n, height, width, 3)`.
pub fn videoread(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Array4<u8>, VideoError> {
    videoread_with_params(path, options).map(|(frames, _)| frames)
}

/// Like [`videoread`], also returning the probed source parameters.
pub fn videoread_with_params(
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> Result<(Array4<u8>, VideoParams), VideoError> {
    let reader = VideoReader::open(path, options)?;
    let (height, width) = reader.resolution().shape();
    let params = reader.params().clone();
    let (n, data) = read_all(reader, height * width * RAW_CHANNELS)?;
    let frames = Array4::from_shape_vec((n, height, width, RAW_CHANNELS), data)
        .map_err(|e| VideoError::process(format!("decoded frames do not form a stack: {e}"), ""))?;
    Ok((frames, params))
}

/// Decodes a video written by [`uint16save`](super::save_frames::uint16save)
/// into `(n, height, width)`.
pub fn uint16read(
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> Result<Array3<u16>, VideoError> {
    let reader = Uint16Reader::open(path, options)?;
    let (height, width) = reader.resolution().shape();
    let (n, data) = read_all(reader, height * width)?;
    Array3::from_shape_vec((n, height, width), data)
        .map_err(|e| VideoError::process(format!("decoded frames do not form a stack: {e}"), ""))
}

/// Drains `reader`, returning the frame count and all samples in order.
fn read_all<C, A>(
    reader: FfmpegReader<C>,
    samples_per_frame: usize,
) -> Result<(usize, Vec<A>), VideoError>
where
    C: FrameCodec,
    C::Frame: IntoIterator<Item = A>,
{
    let mut data = Vec::with_capacity(reader.len_hint().unwrap_or(0) * samples_per_frame);
    let mut n = 0;
    for frame in reader {
        data.extend(frame?);
        n += 1;
    }
    log::debug!("stacked {n} frames ({} samples)", data.len());
    Ok((n, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::save_frames::{uint16save, videosave};
    use crate::shared::frame_rate::FrameRate;
    use crate::shared::preset::Preset;
    use crate::shared::resolution::Resolution;
    use crate::test_support::gradient_frame;
    use crate::video::domain::encode_config::EncodeConfig;
    use ndarray::{s, Axis};

    fn lossless_config() -> EncodeConfig {
        EncodeConfig::new()
            .with_lossless(true)
            .with_preset(Preset::Ultrafast)
            .with_fps(FrameRate::new(24, 1).unwrap())
    }

    fn color_stack(n: usize, height: usize, width: usize) -> Array4<u8> {
        let frames: Vec<_> = (0..n)
            .map(|i| gradient_frame(height, width, (i * 37) as u8))
            .collect();
        let views: Vec<_> = frames.iter().map(|f| f.view()).collect();
        ndarray::stack(Axis(0), &views).unwrap()
    }

    #[test]
    #[ignore] // Requires ffmpeg and ffprobe with libx264
    fn test_lossless_color_round_trip_is_bit_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("color.mp4");
        let frames = color_stack(6, 24, 40);

        videosave(&path, frames.view(), &lossless_config()).unwrap();
        let (decoded, params) = videoread_with_params(&path, &ReadOptions::default()).unwrap();

        assert_eq!(decoded, frames);
        assert_eq!(params.resolution(), Resolution::new(40, 24));
        assert_eq!(params.fps, Some(FrameRate::new(24, 1).unwrap()));
        assert_eq!(params.length, Some(6));
    }

    #[test]
    #[ignore] // Requires ffmpeg and ffprobe with libx264
    fn test_lossy_color_round_trip_stays_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lossy.mp4");
        let frames = color_stack(4, 32, 32);
        let config = EncodeConfig::new().with_preset(Preset::Ultrafast);

        videosave(&path, frames.view(), &config).unwrap();
        let decoded = videoread(&path, &ReadOptions::default()).unwrap();

        assert_eq!(decoded.dim(), frames.dim());
        let mean_error = decoded
            .iter()
            .zip(frames.iter())
            .map(|(&a, &b)| (a as f64 - b as f64).abs())
            .sum::<f64>()
            / frames.len() as f64;
        assert!(mean_error < 12.0, "mean error {mean_error}");
    }

    #[test]
    #[ignore] // Requires ffmpeg and ffprobe with libx264
    fn test_non_contiguous_stack_is_saved_in_logical_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strided.mp4");
        let frames = color_stack(6, 16, 16);
        let every_other = frames.slice(s![..;2, .., .., ..]);

        videosave(&path, every_other, &lossless_config()).unwrap();
        let decoded = videoread(&path, &ReadOptions::default()).unwrap();

        assert_eq!(decoded, every_other);
    }

    #[test]
    #[ignore] // Requires ffmpeg and ffprobe with libx264
    fn test_depth_round_trip_is_exact_across_full_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth.mp4");
        // 4 frames of 128x128 cover every u16 value exactly once.
        let frames = Array3::from_shape_fn((4, 128, 128), |(i, y, x)| {
            (i * 128 * 128 + y * 128 + x) as u16
        });
        let config = EncodeConfig::new().with_preset(Preset::Ultrafast);

        uint16save(&path, frames.view(), &config).unwrap();
        let decoded = uint16read(&path, &ReadOptions::default()).unwrap();

        assert_eq!(decoded, frames);
    }

    #[test]
    #[ignore] // Requires ffmpeg and ffprobe with libx264
    fn test_depth_with_sharp_edges_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.mp4");
        let frames = Array3::from_shape_fn((3, 10, 14), |(i, y, x)| match (i + x + y) % 4 {
            0 => 0,
            1 => u16::MAX,
            2 => 255,
            _ => 256,
        });

        uint16save(&path, frames.view(), &EncodeConfig::new()).unwrap();
        assert_eq!(uint16read(&path, &ReadOptions::default()).unwrap(), frames);
    }

    #[test]
    #[ignore] // Requires ffmpeg and ffprobe with libx264
    fn test_videoread_with_output_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaled.mp4");
        videosave(&path, color_stack(3, 24, 32).view(), &lossless_config()).unwrap();

        let options = ReadOptions::new().with_output_resolution(Resolution::new(16, 12));
        let decoded = videoread(&path, &options).unwrap();
        assert_eq!(decoded.dim(), (3, 12, 16, 3));
    }

    #[test]
    #[ignore] // Requires ffmpeg and ffprobe with libx264
    fn test_uint16read_rejects_output_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth.mp4");
        uint16save(&path, Array3::zeros((2, 8, 8)).view(), &EncodeConfig::new()).unwrap();

        let options = ReadOptions::new().with_output_resolution(Resolution::new(4, 4));
        let result = uint16read(&path, &options);
        assert!(matches!(result, Err(VideoError::Configuration(_))));
    }

    #[test]
    #[ignore] // Requires ffmpeg and ffprobe with libx264
    fn test_read_past_end_returns_empty_stack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.mp4");
        videosave(&path, color_stack(2, 16, 16).view(), &lossless_config()).unwrap();

        let options = ReadOptions::new().with_start_frame(50);
        let decoded = videoread(&path, &options).unwrap();
        assert_eq!(decoded.dim(), (0, 16, 16, 3));
    }

    #[test]
    fn test_videoread_missing_file() {
        let result = videoread("/nonexistent/clip.mp4", &ReadOptions::default());
        assert!(matches!(result, Err(VideoError::FileFormat { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_videoread_of_empty_stream_is_zero_length_stack() {
        use crate::test_support::{fake_tools, fake_video, FakeStream};

        let dir = tempfile::tempdir().unwrap();
        let path = fake_video(dir.path(), "empty.mp4", &FakeStream::rgb(4, 2, 0), &[]);
        let options = ReadOptions::new().with_tools(fake_tools());

        let (frames, params) = videoread_with_params(&path, &options).unwrap();
        assert_eq!(frames.dim(), (0, 2, 4, 3));
        assert_eq!(params.length, Some(0));
    }

    #[cfg(unix)]
    #[test]
    fn test_uint16read_stacks_frames() {
        use crate::codec::infrastructure::uint16_codec::pack_u16;
        use crate::test_support::{fake_tools, fake_video, FakeStream};

        let dir = tempfile::tempdir().unwrap();
        let values: [u16; 2] = [513, 40000];
        // Planar frames of 2x1 pixels, all set to one value each.
        let raw: Vec<u8> = values
            .iter()
            .flat_map(|&v| {
                let [lo, zero, hi] = pack_u16(v);
                [lo, lo, zero, zero, hi, hi]
            })
            .collect();
        let path = fake_video(dir.path(), "depth.mp4", &FakeStream::depth(2, 1, 2), &raw);
        let options = ReadOptions::new().with_tools(fake_tools());

        let frames = uint16read(&path, &options).unwrap();
        assert_eq!(frames, Array3::from_shape_fn((2, 1, 2), |(i, _, _)| values[i]));
    }

    #[cfg(unix)]
    #[test]
    fn test_uint16read_rejects_color_video() {
        use crate::test_support::{fake_tools, fake_video, FakeStream};

        let dir = tempfile::tempdir().unwrap();
        let path = fake_video(dir.path(), "color.mp4", &FakeStream::rgb(2, 1, 1), &[0u8; 6]);
        let options = ReadOptions::new().with_tools(fake_tools());

        let result = uint16read(&path, &options);
        assert!(matches!(result, Err(VideoError::FileFormat { .. })));
    }
}
