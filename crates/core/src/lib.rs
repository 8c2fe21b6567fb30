//! Save and load frame sequences as H.264 video by piping raw pixels
//! through `ffmpeg` and `ffprobe` child processes.
//!
//! Color frames are `Array3<u8>` of shape `(height, width, 3)`. Depth
//! frames are `Array2<u16>` and travel through a bit-packed lossless
//! stream, so they come back exactly as written.

pub mod codec;
pub mod pipeline;
pub mod shared;
pub mod video;

pub use codec::infrastructure::rgb_codec::{unit_float_to_u8, RgbCodec};
pub use codec::infrastructure::uint16_codec::{pack_u16, unpack_u16, Uint16Codec};
pub use pipeline::read_frames::{uint16read, videoread, videoread_with_params};
pub use pipeline::save_frames::{uint16save, uint16save_u8, videosave};
pub use shared::error::VideoError;
pub use shared::frame_rate::FrameRate;
pub use shared::preset::Preset;
pub use shared::resolution::Resolution;
pub use shared::video_metadata::VideoParams;
pub use video::domain::encode_config::EncodeConfig;
pub use video::domain::ffmpeg_tools::FfmpegTools;
pub use video::domain::read_options::ReadOptions;
pub use video::infrastructure::ffmpeg_reader::{FfmpegReader, Uint16Reader, VideoReader};
pub use video::infrastructure::ffmpeg_writer::{FfmpegWriter, Uint16Writer, VideoWriter};
pub use video::infrastructure::ffprobe::read_video_params;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::{Path, PathBuf};

    use ndarray::Array3;

    use crate::shared::frame_rate::FrameRate;
    use crate::shared::preset::Preset;
    use crate::shared::resolution::Resolution;
    use crate::video::domain::encode_config::EncodeConfig;
    use crate::video::domain::ffmpeg_tools::FfmpegTools;
    use crate::video::infrastructure::ffmpeg_writer::VideoWriter;

    #[cfg(unix)]
    const FAKE_FFPROBE: &str = r#"#!/bin/sh
for last; do :; done
cat "$last.json"
"#;

    #[cfg(unix)]
    const FAKE_FFMPEG: &str = r#"#!/bin/sh
input=
while [ $# -gt 0 ]; do
    if [ "$1" = "-i" ]; then input=$2; fi
    shift
done
if [ "$input" = "pipe:0" ]; then
    cat > /dev/null
    exit 0
fi
cat "$input.raw"
if [ -f "$input.hang" ]; then exec sleep 30; fi
exit "$(cat "$input.status" 2>/dev/null || echo 0)"
"#;

    /// Shell stand-ins for ffmpeg and ffprobe that replay files stored next
    /// to the input video: ffprobe prints `<video>.json`; ffmpeg prints
    /// `<video>.raw`, sleeps if `<video>.hang` exists, and exits with the code
    /// in `<video>.status`. Fed from `pipe:0` ffmpeg swallows its input.
    #[cfg(unix)]
    pub(crate) fn fake_tools() -> FfmpegTools {
        use std::os::unix::fs::PermissionsExt;
        use std::sync::OnceLock;

        static DIR: OnceLock<PathBuf> = OnceLock::new();
        let dir = DIR.get_or_init(|| {
            let dir = std::env::temp_dir()
                .join(format!("videoio-fake-tools-{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            for (name, script) in [("ffmpeg", FAKE_FFMPEG), ("ffprobe", FAKE_FFPROBE)] {
                let path = dir.join(name);
                std::fs::write(&path, script).unwrap();
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                    .unwrap();
            }
            dir
        });
        FfmpegTools::new(dir.join("ffmpeg"), dir.join("ffprobe"))
    }

    /// Source stream reported by the fake ffprobe.
    pub(crate) struct FakeStream {
        pub(crate) width: u32,
        pub(crate) height: u32,
        pub(crate) codec: &'static str,
        pub(crate) pixel_format: &'static str,
        pub(crate) length: usize,
    }

    impl FakeStream {
        pub(crate) fn rgb(width: u32, height: u32, length: usize) -> Self {
            Self {
                width,
                height,
                codec: "h264",
                pixel_format: "yuv420p",
                length,
            }
        }

        pub(crate) fn depth(width: u32, height: u32, length: usize) -> Self {
            Self {
                pixel_format: "yuv444p",
                ..Self::rgb(width, height, length)
            }
        }
    }

    /// Creates `dir/name` with the probe output and the raw bytes the fake
    /// decoder will emit for it.
    pub(crate) fn fake_video(dir: &Path, name: &str, stream: &FakeStream, raw: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        let probe = serde_json::json!({
            "streams": [{
                "codec_type": "video",
                "codec_name": stream.codec,
                "width": stream.width,
                "height": stream.height,
                "pix_fmt": stream.pixel_format,
                "avg_frame_rate": "10/1",
                "nb_frames": stream.length.to_string(),
            }]
        });
        std::fs::write(sidecar(&path, "json"), probe.to_string()).unwrap();
        std::fs::write(sidecar(&path, "raw"), raw).unwrap();
        path
    }

    /// Makes the fake decoder for `video` exit with `code` after its output.
    pub(crate) fn fake_exit_status(video: &Path, code: i32) {
        std::fs::write(sidecar(video, "status"), code.to_string()).unwrap();
    }

    /// Makes the fake decoder for `video` stay alive after its output.
    pub(crate) fn fake_hang(video: &Path) {
        std::fs::write(sidecar(video, "hang"), b"").unwrap();
    }

    fn sidecar(video: &Path, ext: &str) -> PathBuf {
        let mut name = video.as_os_str().to_os_string();
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    }

    /// Smooth RGB test pattern shifted by `seed`.
    pub(crate) fn gradient_frame(height: usize, width: usize, seed: u8) -> Array3<u8> {
        Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            let base = match c {
                0 => x * 255 / width.max(1),
                1 => y * 255 / height.max(1),
                _ => (x + y) * 127 / (width + height).max(1),
            };
            ((base + seed as usize) % 256) as u8
        })
    }

    pub(crate) fn write_rgb_video(path: &Path, frames: &[Array3<u8>], lossless: bool) {
        let (height, width, _) = frames[0].dim();
        let resolution = Resolution::from_shape(height, width).unwrap();
        let config = EncodeConfig::new()
            .with_lossless(lossless)
            .with_preset(Preset::Ultrafast)
            .with_fps(FrameRate::new(10, 1).unwrap());
        let mut writer = VideoWriter::open(path, resolution, &config).unwrap();
        for frame in frames {
            writer.write(frame).unwrap();
        }
        writer.close().unwrap();
    }
}
