pub(crate) mod ffmpeg_process;
pub mod ffmpeg_reader;
pub mod ffmpeg_writer;
pub mod ffprobe;
