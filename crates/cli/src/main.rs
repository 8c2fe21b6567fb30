use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use image::{ImageBuffer, Luma, RgbImage};
use ndarray::{Array2, Array3};

use videoio_core::shared::constants::{DEFAULT_FFMPEG, DEFAULT_FFPROBE, IMAGE_EXTENSIONS};
use videoio_core::{
    read_video_params, EncodeConfig, FfmpegTools, FrameRate, Preset, ReadOptions, Resolution,
    Uint16Reader, Uint16Writer, VideoReader, VideoWriter,
};

/// Convert image sequences to and from H.264 video through ffmpeg.
#[derive(Parser)]
#[command(name = "videoio", version)]
struct Cli {
    /// ffmpeg executable.
    #[arg(long, global = true, env = "VIDEOIO_FFMPEG", default_value = DEFAULT_FFMPEG)]
    ffmpeg: PathBuf,

    /// ffprobe executable.
    #[arg(long, global = true, env = "VIDEOIO_FFPROBE", default_value = DEFAULT_FFPROBE)]
    ffprobe: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a directory of PNG frames (sorted by name) into a video.
    Encode(EncodeArgs),
    /// Decode a video into numbered PNG frames.
    Decode(DecodeArgs),
    /// Print the parameters of a video stream as JSON.
    Probe(ProbeArgs),
}

#[derive(Args)]
struct EncodeArgs {
    /// Directory with the input frames.
    input_dir: PathBuf,

    /// Output video file.
    output: PathBuf,

    /// Treat frames as 16-bit depth maps (always lossless).
    #[arg(long)]
    depth: bool,

    /// Encode color frames losslessly.
    #[arg(long)]
    lossless: bool,

    /// x264 preset: ultrafast, superfast, veryfast, faster, fast, medium, slow, veryslow.
    #[arg(long, default_value_t = Preset::default())]
    preset: Preset,

    /// Frame rate, e.g. 30, 29.97 or 30000/1001.
    #[arg(long)]
    fps: Option<FrameRate>,

    /// Write to a temporary file and move it into place on success.
    #[arg(long)]
    atomic: bool,
}

#[derive(Args)]
struct DecodeArgs {
    /// Input video file.
    input: PathBuf,

    /// Directory for the decoded frames.
    output_dir: PathBuf,

    /// Decode a depth video written with `encode --depth` into 16-bit PNGs.
    #[arg(long)]
    depth: bool,

    /// Rescale frames to WIDTHxHEIGHT (color only).
    #[arg(long)]
    resolution: Option<Resolution>,

    /// Resample to this frame rate.
    #[arg(long)]
    fps: Option<FrameRate>,

    /// First frame to decode.
    #[arg(long, default_value = "0")]
    start_frame: usize,
}

#[derive(Args)]
struct ProbeArgs {
    /// Input video file.
    input: PathBuf,

    /// Index among the file's video streams.
    #[arg(long, default_value = "0")]
    stream: usize,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let tools = FfmpegTools::new(cli.ffmpeg, cli.ffprobe);

    match cli.command {
        Command::Encode(args) => run_encode(&args, tools),
        Command::Decode(args) => run_decode(&args, tools),
        Command::Probe(args) => run_probe(&args, &tools),
    }
}

fn run_encode(args: &EncodeArgs, tools: FfmpegTools) -> Result<(), Box<dyn std::error::Error>> {
    if args.depth && args.lossless {
        log::debug!("--lossless is implied by --depth");
    }
    let frames = list_frames(&args.input_dir)?;
    let first = frames
        .first()
        .ok_or_else(|| format!("No PNG frames found in {}", args.input_dir.display()))?;
    let (width, height) = image::image_dimensions(first)?;
    let resolution = Resolution::new(width, height);

    let mut config = EncodeConfig::new()
        .with_preset(args.preset)
        .with_atomic(args.atomic)
        .with_tools(tools);
    if args.lossless {
        config = config.with_lossless(true);
    }
    if let Some(fps) = args.fps {
        config = config.with_fps(fps);
    }

    let total = frames.len();
    if args.depth {
        let mut writer = Uint16Writer::open(&args.output, resolution, &config)?;
        for (i, path) in frames.iter().enumerate() {
            eprint!("\rEncoding frame {}/{total}", i + 1);
            writer.write(&load_depth(path)?)?;
        }
        writer.close()?;
    } else {
        let mut writer = VideoWriter::open(&args.output, resolution, &config)?;
        for (i, path) in frames.iter().enumerate() {
            eprint!("\rEncoding frame {}/{total}", i + 1);
            writer.write(&load_rgb(path)?)?;
        }
        writer.close()?;
    }
    eprintln!();
    log::info!("Encoded {total} frames into {}", args.output.display());
    Ok(())
}

fn run_decode(args: &DecodeArgs, tools: FfmpegTools) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = ReadOptions::new()
        .with_start_frame(args.start_frame)
        .with_tools(tools);
    if let Some(resolution) = args.resolution {
        options = options.with_output_resolution(resolution);
    }
    if let Some(fps) = args.fps {
        options = options.with_output_fps(fps);
    }
    std::fs::create_dir_all(&args.output_dir)?;

    let mut count = 0;
    if args.depth {
        let reader = Uint16Reader::open(&args.input, &options)?;
        let total = total_label(reader.len_hint());
        for frame in reader {
            eprint!("\rDecoding frame {}/{total}", count + 1);
            save_depth(&frame_path(&args.output_dir, count), frame?)?;
            count += 1;
        }
    } else {
        let reader = VideoReader::open(&args.input, &options)?;
        let total = total_label(reader.len_hint());
        for frame in reader {
            eprint!("\rDecoding frame {}/{total}", count + 1);
            save_rgb(&frame_path(&args.output_dir, count), frame?)?;
            count += 1;
        }
    }
    eprintln!();
    log::info!("Decoded {count} frames into {}", args.output_dir.display());
    Ok(())
}

fn run_probe(args: &ProbeArgs, tools: &FfmpegTools) -> Result<(), Box<dyn std::error::Error>> {
    let params = read_video_params(&args.input, args.stream, tools)?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

/// PNG files directly inside `dir`, sorted by file name.
fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("Input directory not found: {}", dir.display()).into());
    }
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame_{index:06}.png"))
}

fn total_label(len: Option<usize>) -> String {
    len.map_or_else(|| "?".to_string(), |n| n.to_string())
}

fn load_rgb(path: &Path) -> Result<Array3<u8>, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Array3::from_shape_vec(
        (height as usize, width as usize, 3),
        img.into_raw(),
    )?)
}

fn load_depth(path: &Path) -> Result<Array2<u16>, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_luma16();
    let (width, height) = img.dimensions();
    Ok(Array2::from_shape_vec(
        (height as usize, width as usize),
        img.into_raw(),
    )?)
}

fn save_rgb(path: &Path, frame: Array3<u8>) -> Result<(), Box<dyn std::error::Error>> {
    let (height, width, _) = frame.dim();
    let data = frame.iter().copied().collect();
    let img = RgbImage::from_raw(width as u32, height as u32, data)
        .ok_or("Failed to create image from frame data")?;
    img.save(path)?;
    Ok(())
}

fn save_depth(path: &Path, frame: Array2<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let (height, width) = frame.dim();
    let data = frame.iter().copied().collect();
    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width as u32, height as u32, data)
        .ok_or("Failed to create image from frame data")?;
    img.save(path)?;
    Ok(())
}
