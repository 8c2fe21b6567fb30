use crate::shared::constants::RAW_CHANNELS;
use crate::shared::error::VideoError;
use crate::shared::resolution::Resolution;
use crate::shared::video_metadata::VideoParams;

/// How the encoder should store the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Encoding {
    /// ffmpeg encoder name (`-c:v`).
    pub encoder: &'static str,
    /// Pixel format of the encoded stream (output `-pix_fmt`).
    pub pixel_format: &'static str,
    pub profile: Option<&'static str>,
    /// Constant quantizer; `Some(0)` selects lossless coding.
    pub qp: Option<u8>,
}

/// Converts between in-memory frames and the raw byte layout on ffmpeg's pipe.
///
/// A codec fixes the pixel semantics of a session: every frame that goes
/// through one reader or writer uses the same codec.
pub trait FrameCodec: Send {
    type Frame;

    /// Short name for log messages.
    fn name(&self) -> &'static str;

    /// ffmpeg `-pix_fmt` of the raw frames on the pipe.
    fn raw_pixel_format(&self) -> &'static str;

    fn encoding(&self, lossless: bool) -> Encoding;

    /// Codecs whose bytes are not visual data cannot survive lossy coding.
    fn requires_lossless(&self) -> bool {
        false
    }

    /// Whether ffmpeg may rescale decoded frames before they reach [`decode`](Self::decode).
    fn supports_rescale(&self) -> bool {
        true
    }

    /// Rejects source streams whose layout this codec cannot decode
    /// faithfully. The reason ends up in a [`VideoError::FileFormat`].
    fn check_source(&self, _params: &VideoParams) -> Result<(), String> {
        Ok(())
    }

    /// Bytes per frame on the pipe.
    fn frame_size(&self, resolution: Resolution) -> usize {
        resolution.pixel_count() * RAW_CHANNELS
    }

    /// Resolution of `frame`, or a shape error if it cannot be encoded at all.
    fn frame_resolution(&self, frame: &Self::Frame) -> Result<Resolution, VideoError>;

    /// Writes `frame` into `out`, which is exactly `frame_size` bytes long.
    fn encode_into(&self, frame: &Self::Frame, out: &mut [u8]);

    fn decode(&self, raw: &[u8], resolution: Resolution) -> Result<Self::Frame, VideoError>;
}
