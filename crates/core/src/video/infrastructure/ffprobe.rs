use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::shared::error::VideoError;
use crate::shared::frame_rate::FrameRate;
use crate::shared::video_metadata::VideoParams;
use crate::video::domain::ffmpeg_tools::FfmpegTools;

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<SideData>,
}

#[derive(Deserialize)]
struct SideData {
    rotation: Option<f64>,
}

/// Reads resolution, frame rate and length of the `stream_number`-th video
/// stream in `path` by running ffprobe.
pub fn read_video_params(
    path: &Path,
    stream_number: usize,
    tools: &FfmpegTools,
) -> Result<VideoParams, VideoError> {
    if !path.is_file() {
        return Err(VideoError::file_format(path, "file does not exist"));
    }

    let output = Command::new(tools.ffprobe())
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => VideoError::ToolNotFound {
                tool: tools.ffprobe().to_path_buf(),
            },
            _ => VideoError::Io(e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VideoError::file_format(
            path,
            format!("ffprobe failed: {}", stderr.trim()),
        ));
    }

    let params = parse_probe_output(&output.stdout, stream_number)
        .map_err(|reason| VideoError::file_format(path, reason))?;
    log::debug!(
        "probed {}: {}x{} fps={:?} length={:?} pix_fmt={}",
        path.display(),
        params.width,
        params.height,
        params.fps.map(|f| f.as_f64()),
        params.length,
        params.pixel_format
    );
    Ok(params)
}

fn parse_probe_output(json: &[u8], stream_number: usize) -> Result<VideoParams, String> {
    let probe: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| format!("malformed ffprobe output: {e}"))?;

    let video_streams: Vec<_> = probe
        .streams
        .into_iter()
        .filter(|s| s.codec_type.as_deref() == Some("video"))
        .collect();
    let count = video_streams.len();
    let stream = video_streams
        .into_iter()
        .nth(stream_number)
        .ok_or_else(|| format!("no video stream #{stream_number} ({count} video streams found)"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no dimensions".to_string()),
    };

    let rotation = stream_rotation(&stream);
    let (width, height) = if rotation % 180 == 90 {
        (height, width)
    } else {
        (width, height)
    };

    Ok(VideoParams {
        width,
        height,
        fps: stream
            .avg_frame_rate
            .as_deref()
            .and_then(FrameRate::parse_probe),
        length: stream.nb_frames.as_deref().and_then(|n| n.parse().ok()),
        codec: stream.codec_name.unwrap_or_default(),
        pixel_format: stream.pix_fmt.unwrap_or_default(),
        rotation,
    })
}

/// Rotation from the legacy `rotate` tag, else from display-matrix side data.
fn stream_rotation(stream: &ProbeStream) -> i32 {
    if let Some(angle) = stream.tags.get("rotate").and_then(|r| r.parse::<i32>().ok()) {
        return normalize_rotation(angle);
    }
    stream
        .side_data_list
        .iter()
        .find_map(|side| side.rotation)
        .map(|angle| normalize_rotation(angle.round() as i32))
        .unwrap_or(0)
}

/// Normalizes an angle to one of 0, 90, 180, or 270.
fn normalize_rotation(angle: i32) -> i32 {
    match angle.rem_euclid(360) {
        0..=44 | 316..=359 => 0,
        45..=134 => 90,
        135..=224 => 180,
        _ => 270,
    }
}
