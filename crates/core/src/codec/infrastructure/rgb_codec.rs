use ndarray::{Array3, ArrayView3};

use crate::codec::domain::frame_codec::{Encoding, FrameCodec};
use crate::shared::constants::RAW_CHANNELS;
use crate::shared::error::VideoError;
use crate::shared::resolution::Resolution;

/// Interleaved 8-bit RGB frames of shape `(height, width, 3)`.
///
/// Lossless sessions use `libx264rgb`, which codes RGB planes directly so
/// decoded pixels match the input bit for bit. Lossy sessions go through
/// YUV 4:2:0 like any regular H.264 video.
#[derive(Clone, Copy, Debug, Default)]
pub struct RgbCodec;

impl FrameCodec for RgbCodec {
    type Frame = Array3<u8>;

    fn name(&self) -> &'static str {
        "rgb"
    }

    fn raw_pixel_format(&self) -> &'static str {
        "rgb24"
    }

    fn encoding(&self, lossless: bool) -> Encoding {
        if lossless {
            Encoding {
                encoder: "libx264rgb",
                pixel_format: "rgb24",
                profile: None,
                qp: Some(0),
            }
        } else {
            Encoding {
                encoder: "libx264",
                pixel_format: "yuv420p",
                profile: None,
                qp: None,
            }
        }
    }

    fn frame_resolution(&self, frame: &Array3<u8>) -> Result<Resolution, VideoError> {
        let (height, width, channels) = frame.dim();
        if channels != RAW_CHANNELS {
            return Err(VideoError::FrameShape {
                expected: format!("{RAW_CHANNELS} channels"),
                actual: format!("{channels} channels"),
            });
        }
        Resolution::from_shape(height, width)
    }

    fn encode_into(&self, frame: &Array3<u8>, out: &mut [u8]) {
        match frame.as_slice() {
            Some(contiguous) => out.copy_from_slice(contiguous),
            None => {
                for (dst, src) in out.iter_mut().zip(frame.iter()) {
                    *dst = *src;
                }
            }
        }
    }

    fn decode(&self, raw: &[u8], resolution: Resolution) -> Result<Array3<u8>, VideoError> {
        let (height, width) = resolution.shape();
        Array3::from_shape_vec((height, width, RAW_CHANNELS), raw.to_vec()).map_err(|e| {
            VideoError::process(format!("raw frame does not match {resolution}: {e}"), "")
        })
    }
}

/// Converts a float frame with values in `[0, 1]` to 8-bit, truncating like
/// a plain `value * 255` cast. Out-of-range values are clamped.
pub fn unit_float_to_u8(frame: ArrayView3<'_, f32>) -> Array3<u8> {
    frame.mapv(|v| (v * 255.0).clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(height: usize, width: usize) -> Array3<u8> {
        Array3::from_shape_fn((height, width, 3), |(y, x, c)| (y * 31 + x * 7 + c * 3) as u8)
    }

    #[test]
    fn test_encode_is_interleaved_row_major() {
        let frame = gradient(2, 3);
        let mut out = vec![0u8; RgbCodec.frame_size(Resolution::new(3, 2))];
        RgbCodec.encode_into(&frame, &mut out);
        // row=1, col=2, channel=1
        assert_eq!(out[(3 + 2) * 3 + 1], frame[[1, 2, 1]]);
        assert_eq!(out.len(), 18);
    }

    #[test]
    fn test_encode_non_contiguous_array_uses_logical_order() {
        let mut transposed = gradient(3, 2);
        transposed.swap_axes(0, 1);
        assert!(transposed.as_slice().is_none());

        let mut out = vec![0u8; 2 * 3 * 3];
        RgbCodec.encode_into(&transposed, &mut out);
        assert_eq!(out[3], transposed[[0, 1, 0]]);
        assert_eq!(out[17], transposed[[1, 2, 2]]);
    }

    #[test]
    fn test_decode_restores_shape_and_values() {
        let frame = gradient(5, 4);
        let resolution = Resolution::new(4, 5);
        let mut raw = vec![0u8; RgbCodec.frame_size(resolution)];
        RgbCodec.encode_into(&frame, &mut raw);
        let decoded = RgbCodec.decode(&raw, resolution).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_short_buffer_is_process_error() {
        let result = RgbCodec.decode(&[0u8; 10], Resolution::new(2, 2));
        assert!(matches!(result, Err(VideoError::CodecProcess { .. })));
    }

    #[test]
    fn test_frame_resolution_rejects_alpha_channel() {
        let rgba = Array3::<u8>::zeros((2, 2, 4));
        assert!(matches!(
            RgbCodec.frame_resolution(&rgba),
            Err(VideoError::FrameShape { .. })
        ));
    }

    #[test]
    fn test_frame_resolution_is_width_by_height() {
        let frame = Array3::<u8>::zeros((480, 640, 3));
        assert_eq!(
            RgbCodec.frame_resolution(&frame).unwrap(),
            Resolution::new(640, 480)
        );
    }

    #[test]
    fn test_lossless_encoding_stays_in_rgb() {
        let enc = RgbCodec.encoding(true);
        assert_eq!(enc.encoder, "libx264rgb");
        assert_eq!(enc.pixel_format, "rgb24");
        assert_eq!(enc.qp, Some(0));
        assert_eq!(RgbCodec.encoding(false).pixel_format, "yuv420p");
    }

    #[test]
    fn test_unit_float_to_u8() {
        let floats = Array3::from_shape_vec((1, 2, 3), vec![0.0, 0.5, 1.0, -0.2, 1.5, 0.999])
            .unwrap();
        let bytes = unit_float_to_u8(floats.view());
        assert_eq!(bytes.as_slice().unwrap(), &[0, 127, 255, 0, 255, 254]);
    }

    #[test]
    fn test_accepts_any_source_layout() {
        let params = crate::shared::video_metadata::VideoParams {
            width: 4,
            height: 2,
            fps: None,
            length: None,
            codec: "mjpeg".to_string(),
            pixel_format: "yuvj420p".to_string(),
            rotation: 0,
        };
        assert!(RgbCodec.check_source(&params).is_ok());
    }
}
