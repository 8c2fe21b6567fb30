use ndarray::Array2;

use crate::codec::domain::frame_codec::{Encoding, FrameCodec};
use crate::shared::error::VideoError;
use crate::shared::resolution::Resolution;
use crate::shared::video_metadata::VideoParams;

const SOURCE_CODEC: &str = "h264";
const SOURCE_PIXEL_FORMAT: &str = "yuv444p";

/// Packs a 16-bit value into the three planes of a `yuv444p` pixel.
///
/// The high byte goes to the third plane. The low byte goes to the first
/// plane, mirrored (`255 - lo`) whenever the high byte is odd, so values on
/// either side of a high-byte carry stay numerically close. The second
/// plane is always zero.
#[inline]
pub fn pack_u16(value: u16) -> [u8; 3] {
    let [hi, lo] = value.to_be_bytes();
    let lo = if hi % 2 == 1 { 255 - lo } else { lo };
    [lo, 0, hi]
}

/// Inverse of [`pack_u16`]; the zero plane is ignored.
#[inline]
pub fn unpack_u16(lo: u8, hi: u8) -> u16 {
    let lo = if hi % 2 == 1 { 255 - lo } else { lo };
    u16::from_be_bytes([hi, lo])
}

/// 16-bit single-channel frames (e.g. depth maps) of shape `(height, width)`.
///
/// Frames travel as planar `yuv444p` and are always coded losslessly: any
/// quantization would scramble the packed bytes. Videos written this way
/// only make sense when read back with the same codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct Uint16Codec;

impl FrameCodec for Uint16Codec {
    type Frame = Array2<u16>;

    fn name(&self) -> &'static str {
        "uint16"
    }

    fn raw_pixel_format(&self) -> &'static str {
        "yuv444p"
    }

    fn encoding(&self, _lossless: bool) -> Encoding {
        Encoding {
            encoder: "libx264",
            pixel_format: SOURCE_PIXEL_FORMAT,
            profile: Some("high444"),
            qp: Some(0),
        }
    }

    fn requires_lossless(&self) -> bool {
        true
    }

    fn supports_rescale(&self) -> bool {
        false
    }

    /// Anything but the stream this codec writes would be upsampled or
    /// converted by ffmpeg and unpack to meaningless values.
    fn check_source(&self, params: &VideoParams) -> Result<(), String> {
        if params.codec != SOURCE_CODEC || params.pixel_format != SOURCE_PIXEL_FORMAT {
            return Err(format!(
                "unsupported pixel layout {}/{} for uint16 frames, expected {SOURCE_CODEC}/{SOURCE_PIXEL_FORMAT}",
                params.codec, params.pixel_format
            ));
        }
        Ok(())
    }

    fn frame_resolution(&self, frame: &Array2<u16>) -> Result<Resolution, VideoError> {
        let (height, width) = frame.dim();
        Resolution::from_shape(height, width)
    }

    fn encode_into(&self, frame: &Array2<u16>, out: &mut [u8]) {
        let plane = frame.len();
        let (low, rest) = out.split_at_mut(plane);
        let (zero, high) = rest.split_at_mut(plane);
        zero.fill(0);
        for ((value, lo), hi) in frame.iter().zip(low.iter_mut()).zip(high.iter_mut()) {
            let [l, _, h] = pack_u16(*value);
            *lo = l;
            *hi = h;
        }
    }

    fn decode(&self, raw: &[u8], resolution: Resolution) -> Result<Array2<u16>, VideoError> {
        let plane = resolution.pixel_count();
        if raw.len() != plane * 3 {
            return Err(VideoError::process(
                format!(
                    "raw frame of {} bytes does not match {resolution} yuv444p",
                    raw.len()
                ),
                "",
            ));
        }
        let low = &raw[..plane];
        let high = &raw[plane * 2..];
        let values = low
            .iter()
            .zip(high)
            .map(|(&lo, &hi)| unpack_u16(lo, hi))
            .collect();
        Array2::from_shape_vec(resolution.shape(), values)
            .map_err(|e| VideoError::process(format!("cannot shape decoded frame: {e}"), ""))
    }
}
