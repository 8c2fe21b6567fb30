pub mod encode_config;
pub mod ffmpeg_tools;
pub mod read_options;
